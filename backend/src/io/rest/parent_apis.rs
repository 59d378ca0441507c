//! # REST API for the Parent Portal
//!
//! A parent proves who they are with their child's access code. Every route
//! except `POST /api/parent/login` requires the code in the `x-access-code`
//! header and rejects requests without it.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use log::{error, info, warn};
use serde::Deserialize;

use crate::domain::validation::{parse_date, today};
use crate::domain::DomainError;
use crate::io::rest::mappers::StudentMapper;
use crate::io::rest::ApiError;
use crate::AppState;
use shared::{
    CreateDonorRatingRequest, ErrorResponse, ParentLoginRequest, ParentSession,
    UpdateAllergiesFeedbackRequest,
};

pub const ACCESS_CODE_HEADER: &str = "x-access-code";

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    /// `YYYY-MM-DD`; today when omitted
    pub date: Option<String>,
}

/// Create a router for parent portal APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/session", get(get_session))
        .route("/logout", post(logout))
        .route("/student", get(get_student).put(update_allergies_and_feedback))
        .route("/today", get(get_day_overview))
        .route("/ratings", post(rate_donor))
}

/// The access code carried by a request, or a 401 response when it has none
fn access_code(headers: &HeaderMap) -> Result<&str, Response> {
    let value = headers.get(ACCESS_CODE_HEADER).ok_or_else(unauthenticated)?;
    value.to_str().map_err(|_| {
        ApiError::from(DomainError::Format("Access code header is not valid text".to_string()))
            .into_response()
    })
}

/// Resolve the parent behind a request from its access code header
async fn resolve_session(state: &AppState, headers: &HeaderMap) -> Result<ParentSession, Response> {
    let code = access_code(headers)?;
    state
        .parent_auth_service
        .authenticate(code)
        .await
        .map_err(|e| {
            warn!("Parent authentication failed: {}", e);
            ApiError::from(e).into_response()
        })
}

fn unauthenticated() -> Response {
    let body = ErrorResponse {
        kind: "unauthenticated".to_string(),
        message: "Access code required".to_string(),
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

/// Log in with an access code and remember the session
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<ParentLoginRequest>,
) -> impl IntoResponse {
    info!("POST /api/parent/login");

    match state
        .parent_auth_service
        .login_with_access_code(&request.access_code)
        .await
    {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(e) => {
            error!("Parent login failed: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// The session stored at login, if it belongs to the presented access code
pub async fn get_session(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    info!("GET /api/parent/session");

    let code = match access_code(&headers) {
        Ok(code) => code,
        Err(response) => return response,
    };

    match state.parent_auth_service.stored_session_for(code).await {
        Ok(Some(session)) => (StatusCode::OK, Json(session)).into_response(),
        Ok(None) => unauthenticated(),
        Err(e) => {
            error!("Failed to read parent session: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Clear the stored session; only its own access code may do so
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    info!("POST /api/parent/logout");

    let code = match access_code(&headers) {
        Ok(code) => code,
        Err(response) => return response,
    };

    let result = match state.parent_auth_service.stored_session_for(code).await {
        Ok(Some(_)) => state.parent_auth_service.logout_parent().await,
        Ok(None) => return unauthenticated(),
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!("Parent logout failed: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Current profile of the parent's child
pub async fn get_student(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    info!("GET /api/parent/student");

    let session = match resolve_session(&state, &headers).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state.parent_portal_service.get_student(&session).await {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(e) => {
            error!("Failed to load student for parent: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Update the child's allergies and meal feedback
pub async fn update_allergies_and_feedback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UpdateAllergiesFeedbackRequest>,
) -> impl IntoResponse {
    info!("PUT /api/parent/student - request: {:?}", request);

    let session = match resolve_session(&state, &headers).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let update = StudentMapper::to_feedback_update(request);
    let portal = &state.parent_portal_service;
    let result = match portal
        .update_student_allergies_and_feedback(&session.teacher_id, &session.student_key, update)
        .await
    {
        Ok(()) => portal.get_student(&session).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(e) => {
            error!("Failed to update allergies and feedback: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Meal, donor and served flag for a day
pub async fn get_day_overview(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DayQuery>,
) -> impl IntoResponse {
    info!("GET /api/parent/today - query: {:?}", query);

    let session = match resolve_session(&state, &headers).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let date = match query.date.as_deref() {
        Some(date) => match parse_date(date, "Date") {
            Ok(date) => date,
            Err(e) => return ApiError::from(e).into_response(),
        },
        None => today(),
    };

    match state.parent_portal_service.day_overview(&session, date).await {
        Ok(overview) => (StatusCode::OK, Json(overview)).into_response(),
        Err(e) => {
            error!("Failed to load day overview: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Rate the donor of a meal
pub async fn rate_donor(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateDonorRatingRequest>,
) -> impl IntoResponse {
    info!("POST /api/parent/ratings - request: {:?}", request);

    let session = match resolve_session(&state, &headers).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state
        .parent_portal_service
        .rate_donor(&session, &request.donor_id, request.rating, request.comment)
        .await
    {
        Ok(rating) => (StatusCode::CREATED, Json(rating)).into_response(),
        Err(e) => {
            error!("Failed to rate donor: {}", e);
            ApiError::from(e).into_response()
        }
    }
}
