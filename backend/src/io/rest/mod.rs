//! # REST API Interface Layer
//!
//! Provides HTTP REST endpoints for the meal donation backend.
//! This layer handles:
//! - HTTP request/response serialization and deserialization
//! - Mapping public DTOs to domain commands
//! - Error translation from domain errors to HTTP status codes
//! - Request logging
//!
//! ## Error Mapping
//!
//! | Domain error   | Status |
//! |----------------|--------|
//! | Validation     | 400    |
//! | Format         | 400    |
//! | NotFound       | 404    |
//! | InvalidState   | 409    |
//! | Store          | 502    |
//! | Storage        | 500    |
//!
//! Error bodies are `{"kind": "...", "message": "..."}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Router,
};
use shared::ErrorResponse;

use crate::domain::DomainError;
use crate::AppState;

// Module declarations
pub mod mappers;
pub mod published_donation_apis;
pub mod donation_request_apis;
pub mod ready_donation_apis;
pub mod meal_stock_apis;
pub mod student_apis;
pub mod parent_apis;
pub mod rating_apis;

/// All API routes, to be nested under `/api`
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/published-donations", published_donation_apis::router())
        .nest("/donation-requests", donation_request_apis::router())
        .nest("/ready-donations", ready_donation_apis::router())
        .nest("/classes/:school_id/:class_id/meals", meal_stock_apis::router())
        .nest("/teachers/:teacher_id", student_apis::router())
        .nest("/parent", parent_apis::router())
        .nest("/donors/:donor_id/ratings", rating_apis::router())
}

/// A domain error on its way out as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        ApiError(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DomainError::Validation(_) | DomainError::Format(_) => StatusCode::BAD_REQUEST,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::InvalidState(_) => StatusCode::CONFLICT,
            DomainError::Store(_) => StatusCode::BAD_GATEWAY,
            DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            kind: self.0.kind().to_string(),
            message: self.0.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
