use chrono::NaiveDate;
use log::{debug, info, warn};
use std::sync::Arc;

use shared::{CreatePublishedDonationRequest, PublishedDonation, PublishedDonationStatus};

use super::errors::{DomainError, DomainResult};
use super::validation::{now_rfc3339, parse_date, require_non_empty, require_positive_amount};
use super::WriteGate;
use crate::storage::repositories::PublishedDonationRepository;
use crate::storage::traits::{DocumentStore, Subscription};

/// Donor listings: what a donor offers, for how many students, until when
#[derive(Clone)]
pub struct PublishedDonationService {
    repository: PublishedDonationRepository,
    write_gate: WriteGate,
}

impl PublishedDonationService {
    pub fn new(store: Arc<dyn DocumentStore>, write_gate: WriteGate) -> Self {
        Self {
            repository: PublishedDonationRepository::new(store),
            write_gate,
        }
    }

    /// Publish a new donation. Remaining students start at the capacity.
    pub async fn create_published_donation(
        &self,
        request: CreatePublishedDonationRequest,
    ) -> DomainResult<PublishedDonation> {
        info!(
            "Publishing donation: donor={}, item={}, students={:?}",
            request.donor_id, request.item_name, request.number_of_students
        );

        // Validate the request
        require_non_empty(&request.donor_id, "Donor id")?;
        require_non_empty(&request.donor_name, "Donor name")?;
        require_non_empty(&request.item_name, "Item name")?;
        require_non_empty(&request.unit, "Unit")?;
        require_positive_amount(request.quantity, "Quantity")?;
        if request.number_of_students == Some(0) {
            return Err(DomainError::validation(
                "Number of students must be at least 1 when given",
            ));
        }
        let available_from = parse_date(&request.available_from, "Available from")?;
        let expiry_date = parse_date(&request.expiry_date, "Expiry date")?;
        if expiry_date < available_from {
            return Err(DomainError::validation(
                "Expiry date cannot be before the available-from date",
            ));
        }

        let now = now_rfc3339();
        let donation = PublishedDonation {
            id: self.repository.next_id().await?,
            donor_id: request.donor_id.trim().to_string(),
            donor_name: request.donor_name.trim().to_string(),
            donor_email: request.donor_email.trim().to_string(),
            item_name: request.item_name.trim().to_string(),
            description: request.description,
            quantity: request.quantity,
            unit: request.unit.trim().to_string(),
            category: request.category,
            number_of_students: request.number_of_students,
            remaining_students: request.number_of_students,
            available_from: request.available_from.trim().to_string(),
            expiry_date: request.expiry_date.trim().to_string(),
            status: PublishedDonationStatus::Available,
            delivery_options: request.delivery_options,
            location: request.location,
            created_at: now.clone(),
            updated_at: now,
        };

        self.repository.store_donation(&donation).await?;

        info!("Published donation {} ({})", donation.id, donation.item_name);
        Ok(donation)
    }

    pub async fn get_published_donation(&self, id: &str) -> DomainResult<PublishedDonation> {
        match self.repository.get_donation(id).await? {
            Some(donation) => Ok(donation),
            None => {
                warn!("Published donation not found: {}", id);
                Err(DomainError::not_found(format!(
                    "Published donation not found: {}",
                    id
                )))
            }
        }
    }

    /// All listings, newest first
    pub async fn list_published_donations(&self) -> DomainResult<Vec<PublishedDonation>> {
        let donations = self.repository.list_donations().await?;
        debug!("Listing {} published donations", donations.len());
        Ok(donations)
    }

    pub async fn list_for_donor(&self, donor_id: &str) -> DomainResult<Vec<PublishedDonation>> {
        let donations = self.repository.list_donations().await?;
        Ok(donations
            .into_iter()
            .filter(|d| d.donor_id == donor_id)
            .collect())
    }

    /// Listings a school can still request on `on`: available, not expired
    /// and with students left to cover.
    pub async fn list_available(&self, on: NaiveDate) -> DomainResult<Vec<PublishedDonation>> {
        let donations = self.repository.list_donations().await?;
        let available: Vec<PublishedDonation> = donations
            .into_iter()
            .filter(|d| is_available_on(d, on))
            .collect();
        debug!("{} published donations available on {}", available.len(), on);
        Ok(available)
    }

    /// Donor-side status change. A fulfilled listing stays fulfilled.
    pub async fn update_status(
        &self,
        id: &str,
        status: PublishedDonationStatus,
    ) -> DomainResult<PublishedDonation> {
        info!("Updating published donation {} to {}", id, status);

        let _guard = self.write_gate.lock().await;
        let mut donation = self.get_published_donation(id).await?;
        if donation.status == PublishedDonationStatus::Fulfilled
            && status != PublishedDonationStatus::Fulfilled
        {
            return Err(DomainError::invalid_state(format!(
                "Published donation {} is already fulfilled",
                id
            )));
        }

        let now = now_rfc3339();
        self.repository.update_status(id, status, &now).await?;
        donation.status = status;
        donation.updated_at = now;
        Ok(donation)
    }

    pub fn listen_to_published_donations(
        &self,
        callback: impl Fn(Vec<PublishedDonation>) + Send + Sync + 'static,
    ) -> DomainResult<Subscription> {
        Ok(self.repository.listen(callback)?)
    }
}

fn is_available_on(donation: &PublishedDonation, on: NaiveDate) -> bool {
    if donation.status != PublishedDonationStatus::Available {
        return false;
    }
    if donation.remaining_students == Some(0) {
        return false;
    }
    match NaiveDate::parse_from_str(&donation.expiry_date, shared::DATE_FORMAT) {
        Ok(expiry) => expiry >= on,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::{sample_published_donation, TestEnvironment};
    use std::sync::Mutex;

    fn setup_test(env: &TestEnvironment) -> PublishedDonationService {
        PublishedDonationService::new(env.store.clone(), env.write_gate.clone())
    }

    #[tokio::test]
    async fn test_create_published_donation() {
        let env = TestEnvironment::new();
        let service = setup_test(&env);

        let donation = service
            .create_published_donation(sample_published_donation(Some(50)))
            .await
            .expect("Failed to publish donation");

        assert!(!donation.id.is_empty());
        assert_eq!(donation.status, PublishedDonationStatus::Available);
        assert_eq!(donation.number_of_students, Some(50));
        assert_eq!(donation.remaining_students, Some(50));

        let stored = service.get_published_donation(&donation.id).await.unwrap();
        assert_eq!(stored, donation);
    }

    #[tokio::test]
    async fn test_create_published_donation_validation() {
        let env = TestEnvironment::new();
        let service = setup_test(&env);

        let mut request = sample_published_donation(Some(10));
        request.item_name = "  ".to_string();
        assert!(matches!(
            service.create_published_donation(request).await,
            Err(DomainError::Validation(_))
        ));

        let mut request = sample_published_donation(Some(10));
        request.quantity = 0.0;
        assert!(service.create_published_donation(request).await.is_err());

        let mut request = sample_published_donation(Some(0));
        request.quantity = 5.0;
        assert!(service.create_published_donation(request).await.is_err());

        let mut request = sample_published_donation(Some(10));
        request.expiry_date = "2023-12-31".to_string();
        assert!(service.create_published_donation(request).await.is_err());

        let mut request = sample_published_donation(Some(10));
        request.available_from = "2024-13-01".to_string();
        assert!(service.create_published_donation(request).await.is_err());

        assert!(service.list_published_donations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_donation() {
        let env = TestEnvironment::new();
        let service = setup_test(&env);

        assert!(matches!(
            service.get_published_donation("nope").await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_available_filters_status_and_expiry() {
        let env = TestEnvironment::new();
        let service = setup_test(&env);
        let on = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        let open = service
            .create_published_donation(sample_published_donation(Some(10)))
            .await
            .unwrap();

        let mut expired = sample_published_donation(Some(10));
        expired.expiry_date = "2025-02-28".to_string();
        service.create_published_donation(expired).await.unwrap();

        let reserved = service
            .create_published_donation(sample_published_donation(None))
            .await
            .unwrap();
        service
            .update_status(&reserved.id, PublishedDonationStatus::Reserved)
            .await
            .unwrap();

        let available = service.list_available(on).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, open.id);
        assert_eq!(service.list_published_donations().await.unwrap().len(), 3);
        assert_eq!(service.list_for_donor("donor-1").await.unwrap().len(), 3);
        assert!(service.list_for_donor("donor-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fulfilled_donation_cannot_reopen() {
        let env = TestEnvironment::new();
        let service = setup_test(&env);

        let donation = service
            .create_published_donation(sample_published_donation(Some(5)))
            .await
            .unwrap();
        service
            .update_status(&donation.id, PublishedDonationStatus::Fulfilled)
            .await
            .unwrap();

        let result = service
            .update_status(&donation.id, PublishedDonationStatus::Available)
            .await;
        assert!(matches!(result, Err(DomainError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_listener_sees_new_donations() {
        let env = TestEnvironment::new();
        let service = setup_test(&env);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let subscription = service
            .listen_to_published_donations(move |donations| {
                sink.lock().unwrap().push(donations.len());
            })
            .unwrap();

        service
            .create_published_donation(sample_published_donation(Some(5)))
            .await
            .unwrap();
        subscription.unsubscribe();
        service
            .create_published_donation(sample_published_donation(Some(5)))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }
}
