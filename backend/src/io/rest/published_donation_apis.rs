//! # REST API for Published Donations
//!
//! Endpoints for donors publishing offers and updating their status.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, put},
    Router,
};
use log::{error, info};
use serde::Deserialize;

use crate::domain::validation::parse_date;
use crate::io::rest::ApiError;
use crate::AppState;
use shared::{CreatePublishedDonationRequest, UpdatePublishedDonationStatusRequest};

/// Optional filters for listing published donations
#[derive(Debug, Deserialize)]
pub struct PublishedDonationQuery {
    pub donor_id: Option<String>,
    /// `YYYY-MM-DD`; only offers available and unexpired on that day
    pub available_on: Option<String>,
}

/// Create a router for published donation APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_published_donations).post(create_published_donation))
        .route("/:id", get(get_published_donation))
        .route("/:id/status", put(update_published_donation_status))
}

/// Publish a new donation offer
pub async fn create_published_donation(
    State(state): State<AppState>,
    Json(request): Json<CreatePublishedDonationRequest>,
) -> impl IntoResponse {
    info!("POST /api/published-donations - request: {:?}", request);

    match state.published_donation_service.create_published_donation(request).await {
        Ok(donation) => (StatusCode::CREATED, Json(donation)).into_response(),
        Err(e) => {
            error!("Failed to create published donation: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// List published donations, optionally for one donor or one day
pub async fn list_published_donations(
    State(state): State<AppState>,
    Query(query): Query<PublishedDonationQuery>,
) -> impl IntoResponse {
    info!("GET /api/published-donations - query: {:?}", query);

    let result = match (query.donor_id.as_deref(), query.available_on.as_deref()) {
        (Some(donor_id), _) => state.published_donation_service.list_for_donor(donor_id).await,
        (None, Some(day)) => match parse_date(day, "Available on") {
            Ok(on) => state.published_donation_service.list_available(on).await,
            Err(e) => Err(e),
        },
        (None, None) => state.published_donation_service.list_published_donations().await,
    };

    match result {
        Ok(donations) => (StatusCode::OK, Json(donations)).into_response(),
        Err(e) => {
            error!("Failed to list published donations: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Get a published donation by ID
pub async fn get_published_donation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/published-donations/{}", id);

    match state.published_donation_service.get_published_donation(&id).await {
        Ok(donation) => (StatusCode::OK, Json(donation)).into_response(),
        Err(e) => {
            error!("Failed to get published donation: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Change the status of a published donation
pub async fn update_published_donation_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdatePublishedDonationStatusRequest>,
) -> impl IntoResponse {
    info!("PUT /api/published-donations/{}/status - request: {:?}", id, request);

    match state
        .published_donation_service
        .update_status(&id, request.status)
        .await
    {
        Ok(donation) => (StatusCode::OK, Json(donation)).into_response(),
        Err(e) => {
            error!("Failed to update published donation status: {}", e);
            ApiError::from(e).into_response()
        }
    }
}
