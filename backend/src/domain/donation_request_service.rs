use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use shared::{
    CreateDonationRequestRequest, DonationRequest, DonationRequestStatus, FulfillmentRecord,
};

use super::commands::fulfillment::{FulfillmentOutcome, RecordFulfillmentCommand};
use super::errors::{DomainError, DomainResult};
use super::validation::{
    now_rfc3339, parse_date, require_non_empty, require_positive_amount, today,
};
use super::WriteGate;
use crate::storage::paths;
use crate::storage::repositories::{DonationRequestRepository, WriteBatch};
use crate::storage::traits::{DocumentStore, Subscription};

/// Whether a payment may push `fulfilledAmount` past `requestedAmount`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FulfillmentPolicy {
    pub allow_overfulfillment: bool,
}

impl Default for FulfillmentPolicy {
    fn default() -> Self {
        Self {
            allow_overfulfillment: true,
        }
    }
}

/// School money requests and the payments recorded against them
#[derive(Clone)]
pub struct DonationRequestService {
    store: Arc<dyn DocumentStore>,
    repository: DonationRequestRepository,
    write_gate: WriteGate,
    policy: FulfillmentPolicy,
}

impl DonationRequestService {
    pub fn new(store: Arc<dyn DocumentStore>, write_gate: WriteGate, policy: FulfillmentPolicy) -> Self {
        Self {
            repository: DonationRequestRepository::new(store.clone()),
            store,
            write_gate,
            policy,
        }
    }

    pub fn policy(&self) -> FulfillmentPolicy {
        self.policy
    }

    pub async fn create_donation_request(
        &self,
        request: CreateDonationRequestRequest,
    ) -> DomainResult<DonationRequest> {
        info!(
            "Creating donation request: school={}, amount={}",
            request.school_id, request.requested_amount
        );

        // Validate the request
        require_non_empty(&request.school_id, "School id")?;
        require_non_empty(&request.principal_id, "Principal id")?;
        require_non_empty(&request.purpose, "Purpose")?;
        require_positive_amount(request.requested_amount, "Requested amount")?;
        let target_date = parse_date(&request.target_date, "Target date")?;
        if target_date < today() {
            return Err(DomainError::validation(format!(
                "Target date {} is in the past",
                request.target_date
            )));
        }

        let now = now_rfc3339();
        let donation_request = DonationRequest {
            id: self.repository.next_id().await?,
            school_id: request.school_id.trim().to_string(),
            school_name: request.school_name.trim().to_string(),
            principal_id: request.principal_id.trim().to_string(),
            principal_name: request.principal_name.trim().to_string(),
            meal_plan_id: request.meal_plan_id,
            requested_amount: request.requested_amount,
            purpose: request.purpose.trim().to_string(),
            description: request.description,
            target_date: request.target_date.trim().to_string(),
            status: DonationRequestStatus::Active,
            fulfilled_amount: 0.0,
            published_donation_id: request.published_donation_id,
            created_at: now.clone(),
            updated_at: now,
        };

        self.repository.store_request(&donation_request).await?;

        info!(
            "Created donation request {} for school {}",
            donation_request.id, donation_request.school_id
        );
        Ok(donation_request)
    }

    pub async fn get_donation_request(&self, id: &str) -> DomainResult<DonationRequest> {
        self.repository.get_request(id).await?.ok_or_else(|| {
            warn!("Donation request not found: {}", id);
            DomainError::not_found(format!("Donation request not found: {}", id))
        })
    }

    /// All requests ordered by target date
    pub async fn list_donation_requests(&self) -> DomainResult<Vec<DonationRequest>> {
        Ok(self.repository.list_requests().await?)
    }

    pub async fn list_for_school(&self, school_id: &str) -> DomainResult<Vec<DonationRequest>> {
        Ok(self.repository.list_for_school(school_id).await?)
    }

    pub async fn list_active(&self) -> DomainResult<Vec<DonationRequest>> {
        let requests = self.repository.list_requests().await?;
        Ok(requests
            .into_iter()
            .filter(|r| r.status == DonationRequestStatus::Active)
            .collect())
    }

    /// Add a payment to a request and append it to the payment log.
    ///
    /// The counter update and the log entry are committed together, and
    /// concurrent payments are serialized so none is lost.
    pub async fn record_fulfillment(
        &self,
        command: RecordFulfillmentCommand,
    ) -> DomainResult<FulfillmentOutcome> {
        info!(
            "Recording fulfillment of {} for request {}",
            command.amount, command.request_id
        );

        require_positive_amount(command.amount, "Fulfillment amount")?;

        let _guard = self.write_gate.lock().await;

        let mut request = self.get_donation_request(&command.request_id).await?;
        if request.status == DonationRequestStatus::Cancelled {
            return Err(DomainError::invalid_state(format!(
                "Donation request {} is cancelled",
                request.id
            )));
        }

        let new_total = request.fulfilled_amount + command.amount;
        if !self.policy.allow_overfulfillment && new_total > request.requested_amount {
            return Err(DomainError::validation(format!(
                "Amount {} exceeds the outstanding {} on request {}",
                command.amount,
                request.outstanding_amount(),
                request.id
            )));
        }

        let now = now_rfc3339();
        request.fulfilled_amount = new_total;
        if request.fulfilled_amount >= request.requested_amount {
            request.status = DonationRequestStatus::Fulfilled;
        }
        request.updated_at = now.clone();

        let record = FulfillmentRecord {
            id: self.repository.next_payment_id(&request.id).await?,
            request_id: request.id.clone(),
            donor_id: command.donor_id,
            amount: command.amount,
            note: command.note,
            recorded_at: now,
        };

        let mut batch = WriteBatch::new();
        batch.put(paths::donation_request(&request.id), &request)?;
        batch.put(
            format!("{}/{}", paths::donation_payments(&request.id), record.id),
            &record,
        )?;
        batch.commit(self.store.as_ref()).await?;

        if request.status == DonationRequestStatus::Fulfilled {
            info!(
                "Donation request {} fulfilled: {} of {}",
                request.id, request.fulfilled_amount, request.requested_amount
            );
        }

        Ok(FulfillmentOutcome { request, record })
    }

    /// Cancel a request regardless of its current status
    pub async fn cancel_donation_request(&self, id: &str) -> DomainResult<DonationRequest> {
        info!("Cancelling donation request {}", id);

        let _guard = self.write_gate.lock().await;

        let mut request = self.get_donation_request(id).await?;
        if request.status == DonationRequestStatus::Fulfilled {
            warn!("Cancelling already fulfilled donation request {}", id);
        }
        request.status = DonationRequestStatus::Cancelled;
        request.updated_at = now_rfc3339();
        self.repository.store_request(&request).await?;
        Ok(request)
    }

    /// Payment log for a request, oldest first
    pub async fn list_fulfillments(&self, request_id: &str) -> DomainResult<Vec<FulfillmentRecord>> {
        self.get_donation_request(request_id).await?;
        Ok(self.repository.list_payments(request_id).await?)
    }

    pub fn listen_to_donation_requests(
        &self,
        callback: impl Fn(Vec<DonationRequest>) + Send + Sync + 'static,
    ) -> DomainResult<Subscription> {
        Ok(self.repository.listen(callback)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::TestEnvironment;

    fn setup_test(env: &TestEnvironment, policy: FulfillmentPolicy) -> DonationRequestService {
        DonationRequestService::new(env.store.clone(), env.write_gate.clone(), policy)
    }

    fn sample_request(amount: f64) -> CreateDonationRequestRequest {
        CreateDonationRequestRequest {
            school_id: "school-1".to_string(),
            school_name: "Hillside Primary".to_string(),
            principal_id: "principal-1".to_string(),
            principal_name: "Ms. Okafor".to_string(),
            meal_plan_id: None,
            requested_amount: amount,
            purpose: "Term 2 lunches".to_string(),
            description: "Hot lunch for grade 4".to_string(),
            target_date: "2099-06-30".to_string(),
            published_donation_id: None,
        }
    }

    fn payment(request_id: &str, amount: f64) -> RecordFulfillmentCommand {
        RecordFulfillmentCommand {
            request_id: request_id.to_string(),
            amount,
            donor_id: Some("donor-1".to_string()),
            note: None,
        }
    }

    #[tokio::test]
    async fn test_create_donation_request() {
        let env = TestEnvironment::new();
        let service = setup_test(&env, FulfillmentPolicy::default());

        let request = service
            .create_donation_request(sample_request(100.0))
            .await
            .expect("Failed to create request");

        assert_eq!(request.status, DonationRequestStatus::Active);
        assert_eq!(request.fulfilled_amount, 0.0);
        assert_eq!(service.get_donation_request(&request.id).await.unwrap(), request);
        assert_eq!(service.list_for_school("school-1").await.unwrap().len(), 1);
        assert!(service.list_for_school("school-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_donation_request_validation() {
        let env = TestEnvironment::new();
        let service = setup_test(&env, FulfillmentPolicy::default());

        for amount in [0.0, -10.0] {
            assert!(matches!(
                service.create_donation_request(sample_request(amount)).await,
                Err(DomainError::Validation(_))
            ));
        }

        let mut past = sample_request(50.0);
        past.target_date = "2000-01-01".to_string();
        assert!(matches!(
            service.create_donation_request(past).await,
            Err(DomainError::Validation(_))
        ));

        let mut malformed = sample_request(50.0);
        malformed.target_date = "30/06/2099".to_string();
        assert!(service.create_donation_request(malformed).await.is_err());

        let mut no_purpose = sample_request(50.0);
        no_purpose.purpose = " ".to_string();
        assert!(service.create_donation_request(no_purpose).await.is_err());

        assert!(service.list_donation_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fulfillment_reaches_requested_amount() {
        let env = TestEnvironment::new();
        let service = setup_test(&env, FulfillmentPolicy::default());
        let request = service.create_donation_request(sample_request(100.0)).await.unwrap();

        let first = service.record_fulfillment(payment(&request.id, 60.0)).await.unwrap();
        assert_eq!(first.request.fulfilled_amount, 60.0);
        assert_eq!(first.request.status, DonationRequestStatus::Active);

        let second = service.record_fulfillment(payment(&request.id, 40.0)).await.unwrap();
        assert_eq!(second.request.fulfilled_amount, 100.0);
        assert_eq!(second.request.status, DonationRequestStatus::Fulfilled);

        // Overshoot is accepted under the default policy
        let third = service.record_fulfillment(payment(&request.id, 10.0)).await.unwrap();
        assert_eq!(third.request.fulfilled_amount, 110.0);
        assert_eq!(third.request.status, DonationRequestStatus::Fulfilled);

        let stored = service.get_donation_request(&request.id).await.unwrap();
        assert_eq!(stored.fulfilled_amount, 110.0);

        let log = service.list_fulfillments(&request.id).await.unwrap();
        let amounts: Vec<f64> = log.iter().map(|r| r.amount).collect();
        assert_eq!(amounts, vec![60.0, 40.0, 10.0]);
    }

    #[tokio::test]
    async fn test_overfulfillment_rejected_when_disabled() {
        let env = TestEnvironment::new();
        let service = setup_test(
            &env,
            FulfillmentPolicy {
                allow_overfulfillment: false,
            },
        );
        let request = service.create_donation_request(sample_request(100.0)).await.unwrap();

        service.record_fulfillment(payment(&request.id, 90.0)).await.unwrap();
        let result = service.record_fulfillment(payment(&request.id, 20.0)).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));

        let done = service.record_fulfillment(payment(&request.id, 10.0)).await.unwrap();
        assert_eq!(done.request.status, DonationRequestStatus::Fulfilled);
        assert_eq!(service.list_fulfillments(&request.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fulfillment_errors() {
        let env = TestEnvironment::new();
        let service = setup_test(&env, FulfillmentPolicy::default());

        assert!(matches!(
            service.record_fulfillment(payment("missing", 5.0)).await,
            Err(DomainError::NotFound(_))
        ));

        let request = service.create_donation_request(sample_request(100.0)).await.unwrap();
        assert!(matches!(
            service.record_fulfillment(payment(&request.id, 0.0)).await,
            Err(DomainError::Validation(_))
        ));

        service.cancel_donation_request(&request.id).await.unwrap();
        assert!(matches!(
            service.record_fulfillment(payment(&request.id, 5.0)).await,
            Err(DomainError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_is_unconditional() {
        let env = TestEnvironment::new();
        let service = setup_test(&env, FulfillmentPolicy::default());
        let request = service.create_donation_request(sample_request(20.0)).await.unwrap();
        service.record_fulfillment(payment(&request.id, 20.0)).await.unwrap();

        let cancelled = service.cancel_donation_request(&request.id).await.unwrap();
        assert_eq!(cancelled.status, DonationRequestStatus::Cancelled);
        assert_eq!(cancelled.fulfilled_amount, 20.0);
        assert!(service.list_active().await.unwrap().is_empty());

        assert!(matches!(
            service.cancel_donation_request("missing").await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_fulfillments_are_not_lost() {
        let env = TestEnvironment::new();
        let service = setup_test(&env, FulfillmentPolicy::default());
        let request = service.create_donation_request(sample_request(1000.0)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let service = service.clone();
            let id = request.id.clone();
            handles.push(tokio::spawn(async move {
                service.record_fulfillment(payment(&id, 5.0)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = service.get_donation_request(&request.id).await.unwrap();
        assert_eq!(stored.fulfilled_amount, 100.0);
        assert_eq!(service.list_fulfillments(&request.id).await.unwrap().len(), 20);
    }
}
