//! # Storage Module
//!
//! Handles all data persistence for the meal donation backend.
//!
//! The domain layer talks to a generic [`DocumentStore`] (get/set/update/push/
//! remove/subscribe over `/`-separated paths) through typed repositories, one
//! per collection. Client-held state such as the parent session goes through
//! [`LocalStorage`].
//!
//! ## Current Implementation
//!
//! - **Document store**: [`JsonDocumentStore`], in-memory or persisted to a
//!   single `database.json` with atomic temp-file writes
//! - **Local storage**: [`FileLocalStorage`] (one file per key) and
//!   [`MemoryLocalStorage`]

pub mod traits;
pub mod paths;
pub mod document_store;
pub mod local_storage;
pub mod repositories;

#[cfg(test)]
pub mod test_utils;

// Re-export the main types that other modules need
pub use traits::{DocumentStore, Listener, LocalStorage, Subscription};
pub use document_store::JsonDocumentStore;
pub use local_storage::{FileLocalStorage, MemoryLocalStorage};
pub use repositories::{
    DonationRequestRepository,
    MealStockRepository,
    MealTrackingRepository,
    PublishedDonationRepository,
    RatingRepository,
    ReadyDonationRepository,
    StudentRecord,
    StudentRepository,
    WriteBatch,
};
