//! # REST API for Donor Ratings
//!
//! Nested under `/api/donors/:donor_id/ratings`. Parents add ratings
//! through `/api/parent/ratings`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use log::{error, info};

use crate::io::rest::ApiError;
use crate::AppState;

/// Create a router for donor rating APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_ratings))
        .route("/summary", get(rating_summary))
}

pub async fn list_ratings(
    State(state): State<AppState>,
    Path(donor_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/donors/{}/ratings", donor_id);

    match state.rating_service.list_ratings(&donor_id).await {
        Ok(ratings) => (StatusCode::OK, Json(ratings)).into_response(),
        Err(e) => {
            error!("Failed to list ratings: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Average star rating and count for a donor
pub async fn rating_summary(
    State(state): State<AppState>,
    Path(donor_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/donors/{}/ratings/summary", donor_id);

    match state.rating_service.rating_summary(&donor_id).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            error!("Failed to summarize ratings: {}", e);
            ApiError::from(e).into_response()
        }
    }
}
