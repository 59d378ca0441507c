//! # REST API for Donation Requests
//!
//! Endpoints for schools asking for money and donors paying toward it.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use log::{error, info};
use serde::Deserialize;

use crate::io::rest::mappers::DonationMapper;
use crate::io::rest::ApiError;
use crate::AppState;
use shared::{CreateDonationRequestRequest, RecordFulfillmentRequest};

#[derive(Debug, Deserialize)]
pub struct DonationRequestQuery {
    pub school_id: Option<String>,
    /// Only pending and partially fulfilled requests
    #[serde(default)]
    pub active: bool,
}

/// Create a router for donation request APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_donation_requests).post(create_donation_request))
        .route("/:id", get(get_donation_request))
        .route("/:id/fulfillments", get(list_fulfillments).post(record_fulfillment))
        .route("/:id/cancel", post(cancel_donation_request))
}

/// Create a new donation request
pub async fn create_donation_request(
    State(state): State<AppState>,
    Json(request): Json<CreateDonationRequestRequest>,
) -> impl IntoResponse {
    info!("POST /api/donation-requests - request: {:?}", request);

    match state.donation_request_service.create_donation_request(request).await {
        Ok(donation_request) => (StatusCode::CREATED, Json(donation_request)).into_response(),
        Err(e) => {
            error!("Failed to create donation request: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// List donation requests
pub async fn list_donation_requests(
    State(state): State<AppState>,
    Query(query): Query<DonationRequestQuery>,
) -> impl IntoResponse {
    info!("GET /api/donation-requests - query: {:?}", query);

    let service = &state.donation_request_service;
    let result = match query.school_id.as_deref() {
        Some(school_id) => service.list_for_school(school_id).await,
        None if query.active => service.list_active().await,
        None => service.list_donation_requests().await,
    };

    match result {
        Ok(requests) => (StatusCode::OK, Json(requests)).into_response(),
        Err(e) => {
            error!("Failed to list donation requests: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Get a donation request by ID
pub async fn get_donation_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/donation-requests/{}", id);

    match state.donation_request_service.get_donation_request(&id).await {
        Ok(donation_request) => (StatusCode::OK, Json(donation_request)).into_response(),
        Err(e) => {
            error!("Failed to get donation request: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Record a payment toward a donation request
pub async fn record_fulfillment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RecordFulfillmentRequest>,
) -> impl IntoResponse {
    info!("POST /api/donation-requests/{}/fulfillments - request: {:?}", id, request);

    let command = DonationMapper::to_fulfillment_command(id, request);
    match state.donation_request_service.record_fulfillment(command).await {
        Ok(outcome) => {
            let response = DonationMapper::to_fulfillment_response(outcome);
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => {
            error!("Failed to record fulfillment: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// List the payments made toward a donation request
pub async fn list_fulfillments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/donation-requests/{}/fulfillments", id);

    match state.donation_request_service.list_fulfillments(&id).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => {
            error!("Failed to list fulfillments: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Cancel a donation request
pub async fn cancel_donation_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("POST /api/donation-requests/{}/cancel", id);

    match state.donation_request_service.cancel_donation_request(&id).await {
        Ok(donation_request) => (StatusCode::OK, Json(donation_request)).into_response(),
        Err(e) => {
            error!("Failed to cancel donation request: {}", e);
            ApiError::from(e).into_response()
        }
    }
}
