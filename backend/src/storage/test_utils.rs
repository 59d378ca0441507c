/// Test utilities for automatic cleanup and consistent test infrastructure
///
/// The document store is backed by a temporary directory that is removed
/// when the environment is dropped, even if the test panics.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use shared::{CreatePublishedDonationRequest, CreateStudentRequest, DeliveryOption, DonationCategory};

use super::document_store::JsonDocumentStore;
use super::local_storage::MemoryLocalStorage;
use super::traits::{DocumentStore, Listener, LocalStorage, Subscription};
use crate::domain::{new_write_gate, WriteGate};

pub struct TestEnvironment {
    pub store: Arc<dyn DocumentStore>,
    /// Concrete handle for listener bookkeeping checks
    pub json_store: JsonDocumentStore,
    pub local_storage: Arc<dyn LocalStorage>,
    pub write_gate: WriteGate,
    /// Base directory path for manual inspection if needed
    pub base_path: PathBuf,
    _temp_dir: TempDir, // Keep alive to prevent cleanup
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let json_store =
            JsonDocumentStore::open(temp_dir.path()).expect("Failed to open test store");
        Self {
            store: Arc::new(json_store.clone()),
            json_store,
            local_storage: Arc::new(MemoryLocalStorage::new()),
            write_gate: new_write_gate(),
            base_path: temp_dir.path().to_path_buf(),
            _temp_dir: temp_dir,
        }
    }
}

/// Store whose multi-path commits stall before landing, holding any write
/// gate the committing service has taken for the whole pause
pub struct SlowCommitStore {
    inner: JsonDocumentStore,
    delay: Duration,
}

impl SlowCommitStore {
    pub fn new(inner: JsonDocumentStore, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl DocumentStore for SlowCommitStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        self.inner.get(path).await
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        self.inner.set(path, value).await
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<()> {
        self.inner.update(path, fields).await
    }

    async fn push(&self, collection: &str) -> Result<String> {
        self.inner.push(collection).await
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.inner.remove(path).await
    }

    async fn multi_update(&self, writes: Vec<(String, Value)>) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.multi_update(writes).await
    }

    fn subscribe(&self, path: &str, listener: Listener) -> Result<Subscription> {
        self.inner.subscribe(path, listener)
    }
}

pub fn sample_published_donation(students: Option<u32>) -> CreatePublishedDonationRequest {
    CreatePublishedDonationRequest {
        donor_id: "donor-1".to_string(),
        donor_name: "Green Grocer".to_string(),
        donor_email: "orders@greengrocer.test".to_string(),
        item_name: "Vegetable rice".to_string(),
        description: "Cooked rice with seasonal vegetables".to_string(),
        quantity: 100.0,
        unit: "portions".to_string(),
        category: DonationCategory::Food,
        number_of_students: students,
        available_from: "2024-01-01".to_string(),
        expiry_date: "2099-12-31".to_string(),
        delivery_options: vec![DeliveryOption::Pickup],
        location: "12 Market Street".to_string(),
    }
}

pub fn sample_student(name: &str) -> CreateStudentRequest {
    CreateStudentRequest {
        student_id: format!("S-{}", name.to_uppercase()),
        name: name.to_string(),
        date_of_birth: "2015-06-15".to_string(),
        grade: "4".to_string(),
        class_id: Some("class-4a".to_string()),
        school_id: Some("school-1".to_string()),
        parent_name: format!("Parent of {}", name),
        parent_contact: "555-0100".to_string(),
        parent_email: "parent@example.test".to_string(),
        allergies: String::new(),
    }
}
