use anyhow::Result;
use log::debug;
use serde_json::{json, Map};
use shared::{PublishedDonation, PublishedDonationStatus};
use std::sync::Arc;

use super::{decode, decode_children, encode, listen_collection};
use crate::storage::paths;
use crate::storage::traits::{DocumentStore, Subscription};

/// Published donations live under `publishedDonations/{id}`
#[derive(Clone)]
pub struct PublishedDonationRepository {
    store: Arc<dyn DocumentStore>,
}

impl PublishedDonationRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn next_id(&self) -> Result<String> {
        self.store.push(paths::PUBLISHED_DONATIONS).await
    }

    pub async fn store_donation(&self, donation: &PublishedDonation) -> Result<()> {
        paths::validate_key(&donation.id)?;
        self.store
            .set(&paths::published_donation(&donation.id), encode(donation)?)
            .await
    }

    pub async fn get_donation(&self, id: &str) -> Result<Option<PublishedDonation>> {
        if paths::validate_key(id).is_err() {
            return Ok(None);
        }
        match self.store.get(&paths::published_donation(id)).await? {
            Some(value) => Ok(Some(decode(value)?)),
            None => Ok(None),
        }
    }

    /// All published donations, newest first
    pub async fn list_donations(&self) -> Result<Vec<PublishedDonation>> {
        let value = self.store.get(paths::PUBLISHED_DONATIONS).await?;
        let mut donations: Vec<PublishedDonation> = decode_children(value)
            .into_iter()
            .map(|(_, donation)| donation)
            .collect();
        donations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!("Loaded {} published donations", donations.len());
        Ok(donations)
    }

    pub async fn update_status(
        &self,
        id: &str,
        status: PublishedDonationStatus,
        updated_at: &str,
    ) -> Result<()> {
        paths::validate_key(id)?;
        let mut fields = Map::new();
        fields.insert("status".to_string(), encode(&status)?);
        fields.insert("updatedAt".to_string(), json!(updated_at));
        self.store.update(&paths::published_donation(id), fields).await
    }

    pub fn listen(
        &self,
        callback: impl Fn(Vec<PublishedDonation>) + Send + Sync + 'static,
    ) -> Result<Subscription> {
        listen_collection(&self.store, paths::PUBLISHED_DONATIONS, callback)
    }
}
