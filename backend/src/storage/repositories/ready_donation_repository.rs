use anyhow::Result;
use serde_json::{Map, Value};
use shared::ReadyDonation;
use std::sync::Arc;

use super::{decode, decode_children, encode, listen_collection};
use crate::storage::paths;
use crate::storage::traits::{DocumentStore, Subscription};

/// Class-level requests against published donations, `readyDonations/{id}`
#[derive(Clone)]
pub struct ReadyDonationRepository {
    store: Arc<dyn DocumentStore>,
}

impl ReadyDonationRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn next_id(&self) -> Result<String> {
        self.store.push(paths::READY_DONATIONS).await
    }

    pub async fn store_ready_donation(&self, ready: &ReadyDonation) -> Result<()> {
        paths::validate_key(&ready.id)?;
        self.store
            .set(&paths::ready_donation(&ready.id), encode(ready)?)
            .await
    }

    pub async fn get_ready_donation(&self, id: &str) -> Result<Option<ReadyDonation>> {
        if paths::validate_key(id).is_err() {
            return Ok(None);
        }
        match self.store.get(&paths::ready_donation(id)).await? {
            Some(value) => Ok(Some(decode(value)?)),
            None => Ok(None),
        }
    }

    /// All ready donations, oldest first
    pub async fn list_ready_donations(&self) -> Result<Vec<ReadyDonation>> {
        let value = self.store.get(paths::READY_DONATIONS).await?;
        let mut items: Vec<ReadyDonation> = decode_children(value)
            .into_iter()
            .map(|(_, ready)| ready)
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    pub async fn update_fields(&self, id: &str, fields: Map<String, Value>) -> Result<()> {
        paths::validate_key(id)?;
        self.store.update(&paths::ready_donation(id), fields).await
    }

    pub fn listen(
        &self,
        callback: impl Fn(Vec<ReadyDonation>) + Send + Sync + 'static,
    ) -> Result<Subscription> {
        listen_collection(&self.store, paths::READY_DONATIONS, callback)
    }
}
