//! # REST API for Teacher-Managed Students
//!
//! Nested under `/api/teachers/:teacher_id`. Covers the student roster,
//! access codes and daily meal service.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use log::{error, info};

use crate::io::rest::mappers::StudentMapper;
use crate::io::rest::ApiError;
use crate::AppState;
use shared::{CreateStudentRequest, RecordMealServiceRequest, UpdateStudentRequest};

/// Create a router for student and meal service APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/students", get(list_students).post(create_student))
        .route(
            "/students/:student_key",
            get(get_student).put(update_student).delete(delete_student),
        )
        .route("/students/:student_key/access-code", post(regenerate_access_code))
        .route("/meal-service", get(list_meal_service).post(record_meal_service))
        .route("/meal-service/reset", post(reset_daily_flags))
}

/// Create a new student with a fresh access code
pub async fn create_student(
    State(state): State<AppState>,
    Path(teacher_id): Path<String>,
    Json(request): Json<CreateStudentRequest>,
) -> impl IntoResponse {
    info!("POST /api/teachers/{}/students - request: {:?}", teacher_id, request);

    match state.student_service.create_student(&teacher_id, request).await {
        Ok(record) => {
            let message = format!("Student created with access code {}", record.student.parent_access_token);
            (StatusCode::CREATED, Json(StudentMapper::to_response(record, message))).into_response()
        }
        Err(e) => {
            error!("Failed to create student: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// List a teacher's students
pub async fn list_students(
    State(state): State<AppState>,
    Path(teacher_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/teachers/{}/students", teacher_id);

    match state.student_service.list_students(&teacher_id).await {
        Ok(records) => (StatusCode::OK, Json(StudentMapper::to_list_response(records))).into_response(),
        Err(e) => {
            error!("Failed to list students: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

pub async fn get_student(
    State(state): State<AppState>,
    Path((teacher_id, student_key)): Path<(String, String)>,
) -> impl IntoResponse {
    info!("GET /api/teachers/{}/students/{}", teacher_id, student_key);

    match state.student_service.get_student(&teacher_id, &student_key).await {
        Ok(record) => (StatusCode::OK, Json(StudentMapper::to_response(record, ""))).into_response(),
        Err(e) => {
            error!("Failed to get student: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

pub async fn update_student(
    State(state): State<AppState>,
    Path((teacher_id, student_key)): Path<(String, String)>,
    Json(request): Json<UpdateStudentRequest>,
) -> impl IntoResponse {
    info!(
        "PUT /api/teachers/{}/students/{} - request: {:?}",
        teacher_id, student_key, request
    );

    match state
        .student_service
        .update_student(&teacher_id, &student_key, request)
        .await
    {
        Ok(record) => {
            (StatusCode::OK, Json(StudentMapper::to_response(record, "Student updated"))).into_response()
        }
        Err(e) => {
            error!("Failed to update student: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Delete a student; its access code stops working
pub async fn delete_student(
    State(state): State<AppState>,
    Path((teacher_id, student_key)): Path<(String, String)>,
) -> impl IntoResponse {
    info!("DELETE /api/teachers/{}/students/{}", teacher_id, student_key);

    match state.student_service.delete_student(&teacher_id, &student_key).await {
        Ok(record) => {
            (StatusCode::OK, Json(StudentMapper::to_response(record, "Student deleted"))).into_response()
        }
        Err(e) => {
            error!("Failed to delete student: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Issue a new access code, retiring the old one
pub async fn regenerate_access_code(
    State(state): State<AppState>,
    Path((teacher_id, student_key)): Path<(String, String)>,
) -> impl IntoResponse {
    info!("POST /api/teachers/{}/students/{}/access-code", teacher_id, student_key);

    match state
        .student_service
        .regenerate_access_code(&teacher_id, &student_key)
        .await
    {
        Ok(record) => {
            let message = format!("New access code {}", record.student.parent_access_token);
            (StatusCode::OK, Json(StudentMapper::to_response(record, message))).into_response()
        }
        Err(e) => {
            error!("Failed to regenerate access code: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Record a meal served to the class and mark the served students
pub async fn record_meal_service(
    State(state): State<AppState>,
    Path(teacher_id): Path<String>,
    Json(request): Json<RecordMealServiceRequest>,
) -> impl IntoResponse {
    info!("POST /api/teachers/{}/meal-service - request: {:?}", teacher_id, request);

    let command = match StudentMapper::to_meal_service_command(teacher_id, request) {
        Ok(command) => command,
        Err(e) => {
            error!("Invalid meal service request: {}", e);
            return ApiError::from(e).into_response();
        }
    };

    match state.meal_tracking_service.record_meal_service(command).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => {
            error!("Failed to record meal service: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

pub async fn list_meal_service(
    State(state): State<AppState>,
    Path(teacher_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/teachers/{}/meal-service", teacher_id);

    match state.meal_tracking_service.list_records(&teacher_id).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => {
            error!("Failed to list meal service records: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

/// Clear every student's served-today flag
pub async fn reset_daily_flags(
    State(state): State<AppState>,
    Path(teacher_id): Path<String>,
) -> impl IntoResponse {
    info!("POST /api/teachers/{}/meal-service/reset", teacher_id);

    match state.meal_tracking_service.reset_daily_flags(&teacher_id).await {
        Ok(cleared) => (StatusCode::OK, Json(serde_json::json!({ "cleared": cleared }))).into_response(),
        Err(e) => {
            error!("Failed to reset served flags: {}", e);
            ApiError::from(e).into_response()
        }
    }
}
