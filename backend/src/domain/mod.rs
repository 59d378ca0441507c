//! # Domain Module
//!
//! Contains all business logic for the meal donation backend.
//!
//! This module encapsulates the rules that move donations from a donor's
//! listing to a class's meal stock, track money requests from schools, and
//! give parents read access to their child's meals through an access code.
//! It operates independently of the HTTP surface and of the concrete
//! document store behind the repositories.
//!
//! ## Module Organization
//!
//! - **published_donation_service**: Donor listings and their availability
//! - **donation_request_service**: School money requests and payments
//! - **lifecycle_service**: Ready-donation state machine and the claim into meal stock
//! - **meal_stock_service**: Per-class stock, coverage decrements and removal
//! - **meal_tracking_service**: Daily meal service records and served flags
//! - **student_service**: Student roster and access-code issuance
//! - **parent_auth_service**: Access-code login and the persisted parent session
//! - **parent_portal_service**: What a logged-in parent can see and edit
//! - **rating_service**: Parent ratings of donors
//!
//! ## Business Rules
//!
//! - A ready donation moves `pending → approved → completed`, or
//!   `pending → rejected`. Completed and rejected are terminal.
//! - Claiming writes the meal stock, the published donation's remaining
//!   students and the completed ready donation in one atomic update.
//! - A money request is fulfilled once its fulfilled amount reaches the
//!   requested amount; a cancelled request accepts no further payments.
//! - Access codes are unique across all students and resolve through the
//!   `accessCodes` index.
//!
//! ## Concurrency
//!
//! Read-modify-write sequences that must not interleave (claims, payments,
//! roster changes) serialize on a shared [`WriteGate`]. The gate only orders
//! writers inside this process; the atomic `multi_update` keeps each commit
//! all-or-nothing.

use std::sync::Arc;
use tokio::sync::Mutex;

pub mod access_code;
pub mod commands;
pub mod errors;
pub mod validation;

pub mod published_donation_service;
pub mod donation_request_service;
pub mod lifecycle_service;
pub mod meal_stock_service;
pub mod meal_tracking_service;
pub mod student_service;
pub mod parent_auth_service;
pub mod parent_portal_service;
pub mod rating_service;

pub use errors::{DomainError, DomainResult};

pub use published_donation_service::PublishedDonationService;
pub use donation_request_service::{DonationRequestService, FulfillmentPolicy};
pub use lifecycle_service::{ClaimOutcome, DonationLifecycleService, ReadyDonationFilter};
pub use meal_stock_service::MealStockService;
pub use meal_tracking_service::MealTrackingService;
pub use student_service::StudentService;
pub use parent_auth_service::ParentAuthService;
pub use parent_portal_service::ParentPortalService;
pub use rating_service::RatingService;

/// Serializes read-modify-write sequences across services
pub type WriteGate = Arc<Mutex<()>>;

pub fn new_write_gate() -> WriteGate {
    Arc::new(Mutex::new(()))
}
