//! End-to-end flows through the REST router, backed by an in-memory store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use meal_donation_backend::domain::FulfillmentPolicy;
use meal_donation_backend::storage::{JsonDocumentStore, MemoryLocalStorage};
use meal_donation_backend::{create_router, AppState};

const SERVICE_DATE: &str = "2030-05-01";

fn test_app() -> Router {
    let state = AppState::new(
        Arc::new(JsonDocumentStore::in_memory()),
        Arc::new(MemoryLocalStorage::new()),
        FulfillmentPolicy::default(),
    );
    create_router(state, None).expect("router")
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    access_code: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(code) = access_code {
        builder = builder.header("x-access-code", code);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

fn published_donation_body(students: u32) -> Value {
    json!({
        "donor_id": "donor-1",
        "donor_name": "Green Grocer",
        "donor_email": "orders@greengrocer.test",
        "item_name": "Vegetable rice",
        "description": "Cooked rice with seasonal vegetables",
        "quantity": 60.0,
        "unit": "portions",
        "category": "food",
        "number_of_students": students,
        "available_from": "2024-01-01",
        "expiry_date": "2099-12-31",
        "delivery_options": ["pickup"],
        "location": "12 Market Street"
    })
}

fn student_body(name: &str) -> Value {
    json!({
        "student_id": format!("S-{}", name),
        "name": name,
        "date_of_birth": "2015-06-15",
        "grade": "4",
        "class_id": "class-4a",
        "school_id": "school-1",
        "parent_name": format!("Parent of {}", name),
        "parent_contact": "555-0100",
        "parent_email": "parent@example.test"
    })
}

#[tokio::test]
async fn test_donation_reaches_parent_portal() {
    let app = test_app();

    // Donor publishes food for 30 students
    let (status, published) = send(
        &app,
        Method::POST,
        "/api/published-donations",
        Some(published_donation_body(30)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(published["remainingStudents"], 30);
    let published_id = published["id"].as_str().unwrap().to_string();

    // School asks for 20 of them for class 4a
    let (status, ready) = send(
        &app,
        Method::POST,
        "/api/ready-donations",
        Some(json!({
            "published_donation_id": published_id,
            "school_id": "school-1",
            "school_name": "Hillside Primary",
            "class_id": "class-4a",
            "principal_id": "principal-1",
            "number_of_students": 20
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ready["status"], "pending");
    let ready_id = ready["id"].as_str().unwrap().to_string();

    // Claiming before approval is refused
    let claim = json!({ "teacher_id": "teacher-1", "date_id": SERVICE_DATE });
    let (status, error) = send(
        &app,
        Method::POST,
        &format!("/api/ready-donations/{}/claim", ready_id),
        Some(claim.clone()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["kind"], "invalid_state");

    let (status, approved) = send(
        &app,
        Method::POST,
        &format!("/api/ready-donations/{}/approve", ready_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");

    let (status, claimed) = send(
        &app,
        Method::POST,
        &format!("/api/ready-donations/{}/claim", ready_id),
        Some(claim),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(claimed["ready_donation"]["status"], "completed");
    assert_eq!(claimed["meal_stock"]["id"], SERVICE_DATE);
    assert_eq!(claimed["meal_stock"]["coverage"], 20);
    assert_eq!(claimed["meal_stock"]["quantity"], 40.0);
    assert_eq!(claimed["remaining_students"], 10);

    let (_, published) = send(
        &app,
        Method::GET,
        &format!("/api/published-donations/{}", published_id),
        None,
        None,
    )
    .await;
    assert_eq!(published["remainingStudents"], 10);
    assert_eq!(published["status"], "available");

    // Teacher enrols a student and serves the claimed meal
    let (status, created) = send(
        &app,
        Method::POST,
        "/api/teachers/teacher-1/students",
        Some(student_body("Ada")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let student_key = created["student_key"].as_str().unwrap().to_string();
    let access_code = created["student"]["parentAccessToken"].as_str().unwrap().to_string();

    let (status, record) = send(
        &app,
        Method::POST,
        "/api/teachers/teacher-1/meal-service",
        Some(json!({
            "school_id": "school-1",
            "class_id": "class-4a",
            "meal_name": "Vegetable rice",
            "served_student_keys": [student_key],
            "meal_stock_id": SERVICE_DATE,
            "date": SERVICE_DATE
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["date"], SERVICE_DATE);

    let (_, stock) = send(
        &app,
        Method::GET,
        &format!("/api/classes/school-1/class-4a/meals/{}", SERVICE_DATE),
        None,
        None,
    )
    .await;
    assert_eq!(stock["coverage"], 19);

    // Parent sees the meal and its donor, then rates the donor
    let (status, overview) = send(
        &app,
        Method::GET,
        &format!("/api/parent/today?date={}", SERVICE_DATE),
        None,
        Some(&access_code),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["meal"]["mealName"], "Vegetable rice");
    assert_eq!(overview["donor"]["donor_id"], "donor-1");
    assert_eq!(overview["meal_served_today"], true);

    let (status, rating) = send(
        &app,
        Method::POST,
        "/api/parent/ratings",
        Some(json!({ "donor_id": "donor-1", "rating": 5, "comment": "Lovely" })),
        Some(&access_code),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rating["parentName"], "Parent of Ada");

    let (_, summary) = send(&app, Method::GET, "/api/donors/donor-1/ratings/summary", None, None).await;
    assert_eq!(summary["count"], 1);
    assert_eq!(summary["average"], 5.0);
}

#[tokio::test]
async fn test_money_request_fulfillment_and_cancel() {
    let app = test_app();

    let (status, request) = send(
        &app,
        Method::POST,
        "/api/donation-requests",
        Some(json!({
            "school_id": "school-1",
            "school_name": "Hillside Primary",
            "principal_id": "principal-1",
            "principal_name": "Ms. Okafor",
            "meal_plan_id": null,
            "requested_amount": 100.0,
            "purpose": "Term lunches",
            "description": "Lunch for class 4a",
            "target_date": "2099-01-01",
            "published_donation_id": null
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = request["id"].as_str().unwrap().to_string();
    let payments = format!("/api/donation-requests/{}/fulfillments", id);

    let (status, first) = send(&app, Method::POST, &payments, Some(json!({ "amount": 60.0 })), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["donation_request"]["status"], "active");

    let (_, second) = send(&app, Method::POST, &payments, Some(json!({ "amount": 40.0 })), None).await;
    assert_eq!(second["donation_request"]["status"], "fulfilled");
    assert_eq!(second["donation_request"]["fulfilledAmount"], 100.0);

    let (_, records) = send(&app, Method::GET, &payments, None, None).await;
    assert_eq!(records.as_array().map(Vec::len), Some(2));

    let (status, cancelled) = send(
        &app,
        Method::POST,
        &format!("/api/donation-requests/{}/cancel", id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, error) = send(&app, Method::POST, &payments, Some(json!({ "amount": 5.0 })), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["kind"], "invalid_state");
}

#[tokio::test]
async fn test_parent_login_session_and_logout() {
    let app = test_app();

    let (_, created) = send(
        &app,
        Method::POST,
        "/api/teachers/teacher-1/students",
        Some(student_body("Ben")),
        None,
    )
    .await;
    let access_code = created["student"]["parentAccessToken"].as_str().unwrap().to_string();

    let (status, error) = send(
        &app,
        Method::POST,
        "/api/parent/login",
        Some(json!({ "access_code": "abc" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["kind"], "format_error");

    let (status, session) = send(
        &app,
        Method::POST,
        "/api/parent/login",
        Some(json!({ "access_code": access_code })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["teacherId"], "teacher-1");

    let (status, session) = send(&app, Method::GET, "/api/parent/session", None, Some(&access_code)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["student"]["name"], "Ben");

    let (status, updated) = send(
        &app,
        Method::PUT,
        "/api/parent/student",
        Some(json!({ "allergies": "peanuts", "feedback": null })),
        Some(&access_code),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Ben");
    assert_eq!(updated["allergies"], "peanuts");

    let (status, _) = send(&app, Method::POST, "/api/parent/logout", None, Some(&access_code)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, "/api/parent/session", None, Some(&access_code)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_parent_routes_ignore_another_parents_login() {
    let app = test_app();

    let (_, ada) = send(
        &app,
        Method::POST,
        "/api/teachers/teacher-1/students",
        Some(student_body("Ada")),
        None,
    )
    .await;
    let (_, bo) = send(
        &app,
        Method::POST,
        "/api/teachers/teacher-1/students",
        Some(student_body("Bo")),
        None,
    )
    .await;
    let ada_code = ada["student"]["parentAccessToken"].as_str().unwrap().to_string();
    let bo_code = bo["student"]["parentAccessToken"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/parent/login",
        Some(json!({ "access_code": ada_code })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // No code, no access, even with a stored login
    let (status, error) = send(&app, Method::GET, "/api/parent/student", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["kind"], "unauthenticated");

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/parent/student",
        Some(json!({ "allergies": "none", "feedback": null })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/parent/session", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A different parent's code sees only their own child and not the stored session
    let (status, student) = send(&app, Method::GET, "/api/parent/student", None, Some(&bo_code)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(student["name"], "Bo");

    let (status, _) = send(&app, Method::GET, "/api/parent/session", None, Some(&bo_code)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::POST, "/api/parent/logout", None, Some(&bo_code)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, ada_student) = send(&app, Method::GET, "/api/parent/student", None, Some(&ada_code)).await;
    assert_eq!(ada_student["allergies"], "");
}

#[tokio::test]
async fn test_regenerated_code_retires_parent_session() {
    let app = test_app();

    let (_, created) = send(
        &app,
        Method::POST,
        "/api/teachers/teacher-1/students",
        Some(student_body("Cy")),
        None,
    )
    .await;
    let student_key = created["student_key"].as_str().unwrap().to_string();
    let old_code = created["student"]["parentAccessToken"].as_str().unwrap().to_string();

    send(
        &app,
        Method::POST,
        "/api/parent/login",
        Some(json!({ "access_code": old_code })),
        None,
    )
    .await;

    let (status, regenerated) = send(
        &app,
        Method::POST,
        &format!("/api/teachers/teacher-1/students/{}/access-code", student_key),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new_code = regenerated["student"]["parentAccessToken"].as_str().unwrap().to_string();
    assert_ne!(new_code, old_code);

    let (status, _) = send(&app, Method::GET, "/api/parent/session", None, Some(&old_code)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/parent/student",
        Some(json!({ "allergies": "none", "feedback": null })),
        Some(&old_code),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/parent/student",
        Some(json!({ "allergies": "none", "feedback": null })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, student) = send(&app, Method::GET, "/api/parent/student", None, Some(&new_code)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(student["allergies"], "");
}
