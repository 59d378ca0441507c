//! # Storage Traits
//!
//! Abstractions over the realtime document store and the client-side local
//! storage, so the domain layer can run against any backend (in-memory,
//! JSON file, a hosted document database) without modification.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Callback invoked with the current value of a watched path (`None` when absent)
pub type Listener = Arc<dyn Fn(Option<Value>) + Send + Sync>;

/// Path-addressed JSON document store
///
/// Paths are `/`-separated segments such as `students/{teacherId}/{studentKey}`.
/// Writing `Value::Null` anywhere deletes the addressed node.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the value at a path
    async fn get(&self, path: &str) -> Result<Option<Value>>;

    /// Overwrite the value at a path (`Null` deletes)
    async fn set(&self, path: &str, value: Value) -> Result<()>;

    /// Merge the given fields one level below `path`
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<()>;

    /// Generate a new, time-ordered child key for a collection.
    /// Nothing is written until the caller sets a value at that key.
    async fn push(&self, collection: &str) -> Result<String>;

    /// Delete the value at a path
    async fn remove(&self, path: &str) -> Result<()>;

    /// Apply several writes as one unit: either all land or none do
    async fn multi_update(&self, writes: Vec<(String, Value)>) -> Result<()>;

    /// Watch a subtree. The listener fires immediately with the current value,
    /// then after every write that touches the subtree.
    fn subscribe(&self, path: &str, listener: Listener) -> Result<Subscription>;
}

/// Client-side key/value persistence (device storage)
#[async_trait]
pub trait LocalStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove several keys; missing keys are ignored
    async fn remove_items(&self, keys: &[&str]) -> Result<()>;
}

/// Handle for a live listener registration
///
/// Call [`Subscription::unsubscribe`] to stop receiving updates. Dropping the
/// handle unsubscribes as well.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
