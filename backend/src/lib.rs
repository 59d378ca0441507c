//! # Meal Donation Backend
//!
//! Connects food and money donors with schools, and schools with the
//! parents of the students they feed.
//!
//! This crate serves as the orchestration layer that brings together:
//! - **Domain**: Donation lifecycle, meal stock, students and parent portal rules
//! - **Storage**: A generic document store plus client-side local storage
//! - **IO**: JSON REST API exposing the domain services
//!
//! ## Architecture
//!
//! ```text
//! Clients (donor, school, teacher and parent apps)
//!     ↓
//! IO Layer (REST API, mappers)
//!     ↓
//! Domain Layer (services, validation, commands)
//!     ↓
//! Storage Layer (DocumentStore, repositories, LocalStorage)
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use log::info;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::domain::{
    new_write_gate, DonationLifecycleService, DonationRequestService, FulfillmentPolicy,
    MealStockService, MealTrackingService, ParentAuthService, ParentPortalService,
    PublishedDonationService, RatingService, StudentService,
};
use crate::storage::{DocumentStore, FileLocalStorage, JsonDocumentStore, LocalStorage};

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub published_donation_service: PublishedDonationService,
    pub donation_request_service: DonationRequestService,
    pub lifecycle_service: DonationLifecycleService,
    pub meal_stock_service: MealStockService,
    pub meal_tracking_service: MealTrackingService,
    pub student_service: StudentService,
    pub parent_auth_service: ParentAuthService,
    pub parent_portal_service: ParentPortalService,
    pub rating_service: RatingService,
}

impl AppState {
    /// Wire every service to one store. Every service that reads before it
    /// writes shares a single write gate.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        local_storage: Arc<dyn LocalStorage>,
        policy: FulfillmentPolicy,
    ) -> Self {
        let write_gate = new_write_gate();

        let meal_tracking_service = MealTrackingService::new(store.clone(), write_gate.clone());
        let rating_service = RatingService::new(store.clone());

        Self {
            published_donation_service: PublishedDonationService::new(
                store.clone(),
                write_gate.clone(),
            ),
            donation_request_service: DonationRequestService::new(
                store.clone(),
                write_gate.clone(),
                policy,
            ),
            lifecycle_service: DonationLifecycleService::new(store.clone(), write_gate.clone()),
            meal_stock_service: MealStockService::new(store.clone(), write_gate.clone()),
            student_service: StudentService::new(store.clone(), write_gate.clone()),
            parent_auth_service: ParentAuthService::new(store.clone(), local_storage),
            parent_portal_service: ParentPortalService::new(
                store,
                meal_tracking_service.clone(),
                rating_service.clone(),
                write_gate,
            ),
            meal_tracking_service,
            rating_service,
        }
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Setting up document store in {}", config.data_dir.display());
    let store = JsonDocumentStore::open(&config.data_dir)
        .with_context(|| format!("Failed to open document store in {}", config.data_dir.display()))?;
    let local_storage = FileLocalStorage::new(config.data_dir.join("local_storage"))
        .context("Failed to open local storage")?;

    info!("Setting up domain model");
    let app_state = AppState::new(Arc::new(store), Arc::new(local_storage), config.fulfillment);

    let indexed = app_state
        .student_service
        .rebuild_access_code_index()
        .await
        .context("Failed to rebuild access code index")?;
    info!("Access code index holds {} entries", indexed);

    Ok(app_state)
}

/// Create the Axum router with all routes configured.
/// `cors_origin` of `None` allows any origin.
pub fn create_router(app_state: AppState, cors_origin: Option<&str>) -> Result<Router> {
    // CORS setup to allow frontends to make requests
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);
    let cors = match cors_origin {
        Some(origin) => {
            let origin = origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin: {}", origin))?;
            cors.allow_origin(origin)
        }
        None => cors.allow_origin(Any),
    };

    Ok(Router::new()
        .nest("/api", io::rest::api_router())
        .layer(cors)
        .with_state(app_state))
}
