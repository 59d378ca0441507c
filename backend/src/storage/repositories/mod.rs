// Repository modules
pub mod published_donation_repository;
pub mod donation_request_repository;
pub mod ready_donation_repository;
pub mod meal_stock_repository;
pub mod student_repository;
pub mod meal_tracking_repository;
pub mod rating_repository;

// Re-export repository types
pub use published_donation_repository::PublishedDonationRepository;
pub use donation_request_repository::DonationRequestRepository;
pub use ready_donation_repository::ReadyDonationRepository;
pub use meal_stock_repository::MealStockRepository;
pub use student_repository::{StudentRecord, StudentRepository};
pub use meal_tracking_repository::MealTrackingRepository;
pub use rating_repository::RatingRepository;

use anyhow::{Context, Result};
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::traits::{DocumentStore, Subscription};

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("Failed to serialize document")
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).context("Failed to deserialize document")
}

/// Decode every child of a collection node, skipping malformed entries
pub(crate) fn decode_children<T: DeserializeOwned>(value: Option<Value>) -> Vec<(String, T)> {
    let Some(Value::Object(map)) = value else {
        return Vec::new();
    };

    map.into_iter()
        .filter_map(|(key, child)| match serde_json::from_value::<T>(child) {
            Ok(item) => Some((key, item)),
            Err(e) => {
                warn!("Skipping malformed document {}: {}", key, e);
                None
            }
        })
        .collect()
}

/// Subscribe to a collection and hand the callback its decoded members
pub fn listen_collection<T, F>(
    store: &Arc<dyn DocumentStore>,
    path: &str,
    callback: F,
) -> Result<Subscription>
where
    T: DeserializeOwned + 'static,
    F: Fn(Vec<T>) + Send + Sync + 'static,
{
    store.subscribe(
        path,
        Arc::new(move |value| {
            let items = decode_children::<T>(value)
                .into_iter()
                .map(|(_, item)| item)
                .collect();
            callback(items);
        }),
    )
}

/// A set of writes committed through a single `multi_update`
#[derive(Debug, Default)]
pub struct WriteBatch {
    writes: Vec<(String, Value)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<T: Serialize>(&mut self, path: String, value: &T) -> Result<&mut Self> {
        self.writes.push((path, encode(value)?));
        Ok(self)
    }

    pub fn put_value(&mut self, path: String, value: Value) -> &mut Self {
        self.writes.push((path, value));
        self
    }

    pub fn delete(&mut self, path: String) -> &mut Self {
        self.writes.push((path, Value::Null));
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub async fn commit(self, store: &dyn DocumentStore) -> Result<()> {
        if self.writes.is_empty() {
            return Ok(());
        }
        store.multi_update(self.writes).await
    }
}
