//! # REST API for Class Meal Stock
//!
//! Nested under `/api/classes/:school_id/:class_id/meals`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use log::{error, info};

use crate::io::rest::ApiError;
use crate::AppState;
use shared::DecreaseMealStockRequest;

/// Create a router for meal stock APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_class_stock))
        .route("/:date_id", get(get_meal_stock).delete(delete_meal_stock))
        .route("/:date_id/decrease", post(decrease_meal_stock))
}

/// List every stock entry held by a class
pub async fn list_class_stock(
    State(state): State<AppState>,
    Path((school_id, class_id)): Path<(String, String)>,
) -> impl IntoResponse {
    info!("GET /api/classes/{}/{}/meals", school_id, class_id);

    match state.meal_stock_service.list_class_stock(&school_id, &class_id).await {
        Ok(stock) => (StatusCode::OK, Json(stock)).into_response(),
        Err(e) => {
            error!("Failed to list meal stock: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

pub async fn get_meal_stock(
    State(state): State<AppState>,
    Path((school_id, class_id, date_id)): Path<(String, String, String)>,
) -> impl IntoResponse {
    info!("GET /api/classes/{}/{}/meals/{}", school_id, class_id, date_id);

    match state
        .meal_stock_service
        .get_meal_stock(&school_id, &class_id, &date_id)
        .await
    {
        Ok(stock) => (StatusCode::OK, Json(stock)).into_response(),
        Err(e) => {
            error!("Failed to get meal stock: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Reduce how many students a stock entry still covers
pub async fn decrease_meal_stock(
    State(state): State<AppState>,
    Path((school_id, class_id, date_id)): Path<(String, String, String)>,
    Json(request): Json<DecreaseMealStockRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/classes/{}/{}/meals/{}/decrease - request: {:?}",
        school_id, class_id, date_id, request
    );

    match state
        .meal_stock_service
        .decrease_meal_stock(&school_id, &class_id, &date_id, request.amount)
        .await
    {
        Ok(stock) => (StatusCode::OK, Json(stock)).into_response(),
        Err(e) => {
            error!("Failed to decrease meal stock: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

pub async fn delete_meal_stock(
    State(state): State<AppState>,
    Path((school_id, class_id, date_id)): Path<(String, String, String)>,
) -> impl IntoResponse {
    info!("DELETE /api/classes/{}/{}/meals/{}", school_id, class_id, date_id);

    match state
        .meal_stock_service
        .delete_meal_stock(&school_id, &class_id, &date_id)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!("Failed to delete meal stock: {}", e);
            ApiError::from(e).into_response()
        }
    }
}
