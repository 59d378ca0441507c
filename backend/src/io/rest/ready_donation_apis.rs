//! # REST API for Ready Donations
//!
//! Endpoints for the class-scoped request lifecycle:
//! create (pending), approve or reject, then claim into meal stock.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use log::{error, info};

use crate::io::rest::mappers::DonationMapper;
use crate::io::rest::ApiError;
use crate::AppState;
use shared::{
    ClaimReadyDonationRequest, CreateReadyDonationRequest, ReadyDonationListQuery,
    RejectReadyDonationRequest,
};

/// Create a router for ready donation APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_ready_donations).post(create_ready_donation))
        .route("/:id", get(get_ready_donation))
        .route("/:id/approve", post(approve_ready_donation))
        .route("/:id/reject", post(reject_ready_donation))
        .route("/:id/claim", post(claim_ready_donation))
}

/// Ask for part of a published donation for one class
pub async fn create_ready_donation(
    State(state): State<AppState>,
    Json(request): Json<CreateReadyDonationRequest>,
) -> impl IntoResponse {
    info!("POST /api/ready-donations - request: {:?}", request);

    match state.lifecycle_service.create_ready_donation(request).await {
        Ok(ready) => (StatusCode::CREATED, Json(ready)).into_response(),
        Err(e) => {
            error!("Failed to create ready donation: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// List ready donations matching the query filters
pub async fn list_ready_donations(
    State(state): State<AppState>,
    Query(query): Query<ReadyDonationListQuery>,
) -> impl IntoResponse {
    info!("GET /api/ready-donations - query: {:?}", query);

    let filter = DonationMapper::to_filter(query);
    match state.lifecycle_service.list_ready_donations(&filter).await {
        Ok(ready) => (StatusCode::OK, Json(ready)).into_response(),
        Err(e) => {
            error!("Failed to list ready donations: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Get a ready donation by ID
pub async fn get_ready_donation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/ready-donations/{}", id);

    match state.lifecycle_service.get_ready_donation(&id).await {
        Ok(ready) => (StatusCode::OK, Json(ready)).into_response(),
        Err(e) => {
            error!("Failed to get ready donation: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Donor approves a pending ready donation
pub async fn approve_ready_donation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("POST /api/ready-donations/{}/approve", id);

    match state.lifecycle_service.approve_ready_donation(&id).await {
        Ok(ready) => (StatusCode::OK, Json(ready)).into_response(),
        Err(e) => {
            error!("Failed to approve ready donation: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Donor rejects a pending ready donation; the body and reason are optional
pub async fn reject_ready_donation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<RejectReadyDonationRequest>>,
) -> impl IntoResponse {
    info!("POST /api/ready-donations/{}/reject - request: {:?}", id, body);

    let reason = body.and_then(|Json(request)| request.reason);
    match state.lifecycle_service.reject_ready_donation(&id, reason).await {
        Ok(ready) => (StatusCode::OK, Json(ready)).into_response(),
        Err(e) => {
            error!("Failed to reject ready donation: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Teacher claims an approved ready donation into class meal stock
pub async fn claim_ready_donation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ClaimReadyDonationRequest>,
) -> impl IntoResponse {
    info!("POST /api/ready-donations/{}/claim - request: {:?}", id, request);

    let target = DonationMapper::to_claim_target(request);
    match state.lifecycle_service.claim_ready_donation(&id, target).await {
        Ok(outcome) => {
            let response = DonationMapper::to_claim_response(outcome);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Failed to claim ready donation: {}", e);
            ApiError::from(e).into_response()
        }
    }
}
