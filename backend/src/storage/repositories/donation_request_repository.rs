use anyhow::Result;
use log::debug;
use shared::{DonationRequest, FulfillmentRecord};
use std::sync::Arc;

use super::{decode, decode_children, encode, listen_collection};
use crate::storage::paths;
use crate::storage::traits::{DocumentStore, Subscription};

/// Money requests under `donationRequests/{id}` plus their payment log
/// under `donationPayments/{requestId}/{key}`
#[derive(Clone)]
pub struct DonationRequestRepository {
    store: Arc<dyn DocumentStore>,
}

impl DonationRequestRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn next_id(&self) -> Result<String> {
        self.store.push(paths::DONATION_REQUESTS).await
    }

    pub async fn next_payment_id(&self, request_id: &str) -> Result<String> {
        self.store.push(&paths::donation_payments(request_id)).await
    }

    pub async fn store_request(&self, request: &DonationRequest) -> Result<()> {
        paths::validate_key(&request.id)?;
        self.store
            .set(&paths::donation_request(&request.id), encode(request)?)
            .await
    }

    pub async fn get_request(&self, id: &str) -> Result<Option<DonationRequest>> {
        if paths::validate_key(id).is_err() {
            return Ok(None);
        }
        match self.store.get(&paths::donation_request(id)).await? {
            Some(value) => Ok(Some(decode(value)?)),
            None => Ok(None),
        }
    }

    /// All requests ordered by target date, earliest first
    pub async fn list_requests(&self) -> Result<Vec<DonationRequest>> {
        let value = self.store.get(paths::DONATION_REQUESTS).await?;
        let mut requests: Vec<DonationRequest> = decode_children(value)
            .into_iter()
            .map(|(_, request)| request)
            .collect();
        requests.sort_by(|a, b| a.target_date.cmp(&b.target_date).then(a.id.cmp(&b.id)));
        debug!("Loaded {} donation requests", requests.len());
        Ok(requests)
    }

    pub async fn list_for_school(&self, school_id: &str) -> Result<Vec<DonationRequest>> {
        let requests = self.list_requests().await?;
        Ok(requests
            .into_iter()
            .filter(|r| r.school_id == school_id)
            .collect())
    }

    /// Payments applied to a request, oldest first
    pub async fn list_payments(&self, request_id: &str) -> Result<Vec<FulfillmentRecord>> {
        if paths::validate_key(request_id).is_err() {
            return Ok(Vec::new());
        }
        let value = self.store.get(&paths::donation_payments(request_id)).await?;
        let mut payments: Vec<FulfillmentRecord> = decode_children(value)
            .into_iter()
            .map(|(_, payment)| payment)
            .collect();
        payments.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(payments)
    }

    pub fn listen(
        &self,
        callback: impl Fn(Vec<DonationRequest>) + Send + Sync + 'static,
    ) -> Result<Subscription> {
        listen_collection(&self.store, paths::DONATION_REQUESTS, callback)
    }
}
