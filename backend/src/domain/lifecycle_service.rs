//! Ready-donation lifecycle.
//!
//! A school turns part of a published donation into a *ready donation* for
//! one class. The donor approves or rejects it; a teacher then claims the
//! approved donation into the class's meal stock.
//!
//! ```text
//! pending ──approve──▶ approved ──claim──▶ completed
//!    │
//!    └────reject────▶ rejected
//! ```

use log::{debug, info, warn};
use serde_json::{json, Map};
use std::sync::Arc;

use shared::{
    date_key, CreateReadyDonationRequest, MealStock, PublishedDonation, PublishedDonationStatus,
    ReadyDonation, ReadyDonationStatus,
};

use super::commands::lifecycle::ClaimTarget;
use super::errors::{DomainError, DomainResult};
use super::validation::{now_rfc3339, require_non_empty, today};
use super::WriteGate;
use crate::storage::paths;
use crate::storage::repositories::{
    encode, MealStockRepository, PublishedDonationRepository, ReadyDonationRepository, WriteBatch,
};
use crate::storage::traits::{DocumentStore, Subscription};

/// Highest suffix tried when a date's meal stock already belongs to another donor
const MAX_STOCK_SUFFIX: u32 = 50;

/// Optional criteria for listing ready donations
#[derive(Debug, Clone, Default)]
pub struct ReadyDonationFilter {
    pub donor_id: Option<String>,
    pub class_id: Option<String>,
    pub published_donation_id: Option<String>,
}

impl ReadyDonationFilter {
    fn matches(&self, ready: &ReadyDonation) -> bool {
        self.donor_id.as_deref().map_or(true, |d| ready.donor_id == d)
            && self.class_id.as_deref().map_or(true, |c| ready.class_id == c)
            && self
                .published_donation_id
                .as_deref()
                .map_or(true, |p| ready.published_donation_id == p)
    }
}

/// Everything a successful claim wrote
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    pub ready_donation: ReadyDonation,
    pub meal_stock: MealStock,
    pub published_donation: PublishedDonation,
}

#[derive(Clone)]
pub struct DonationLifecycleService {
    store: Arc<dyn DocumentStore>,
    published: PublishedDonationRepository,
    ready: ReadyDonationRepository,
    meal_stock: MealStockRepository,
    write_gate: WriteGate,
}

impl DonationLifecycleService {
    pub fn new(store: Arc<dyn DocumentStore>, write_gate: WriteGate) -> Self {
        Self {
            published: PublishedDonationRepository::new(store.clone()),
            ready: ReadyDonationRepository::new(store.clone()),
            meal_stock: MealStockRepository::new(store.clone()),
            store,
            write_gate,
        }
    }

    /// Reserve `number_of_students` of a published donation for one class.
    /// The new ready donation starts out pending.
    pub async fn create_ready_donation(
        &self,
        request: CreateReadyDonationRequest,
    ) -> DomainResult<ReadyDonation> {
        info!(
            "Creating ready donation: published={}, school={}, class={}, students={}",
            request.published_donation_id,
            request.school_id,
            request.class_id,
            request.number_of_students
        );

        // Validate the request
        require_non_empty(&request.school_id, "School id")?;
        require_non_empty(&request.class_id, "Class id")?;
        require_non_empty(&request.principal_id, "Principal id")?;
        paths::validate_key(&request.school_id)
            .and(paths::validate_key(&request.class_id))
            .map_err(|e| DomainError::validation(e.to_string()))?;
        if request.number_of_students == 0 {
            return Err(DomainError::validation(
                "Number of students must be at least 1",
            ));
        }

        let published = self.load_published(&request.published_donation_id).await?;
        if published.status != PublishedDonationStatus::Available {
            return Err(DomainError::invalid_state(format!(
                "Published donation {} is {} and cannot be requested",
                published.id, published.status
            )));
        }
        if let Some(remaining) = published.remaining_students {
            if request.number_of_students > remaining {
                return Err(DomainError::validation(format!(
                    "Only {} students remain on published donation {}",
                    remaining, published.id
                )));
            }
        }

        let ready = ReadyDonation {
            id: self.ready.next_id().await?,
            published_donation_id: published.id.clone(),
            donor_id: published.donor_id.clone(),
            school_id: request.school_id.trim().to_string(),
            school_name: request.school_name.trim().to_string(),
            class_id: request.class_id.trim().to_string(),
            principal_id: request.principal_id.trim().to_string(),
            number_of_students: request.number_of_students,
            status: ReadyDonationStatus::Pending,
            rejection_reason: None,
            created_at: now_rfc3339(),
            approved_at: None,
            rejected_at: None,
            completed_at: None,
            claimed_by: None,
        };
        self.ready.store_ready_donation(&ready).await?;

        info!("Created ready donation {}", ready.id);
        Ok(ready)
    }

    pub async fn get_ready_donation(&self, id: &str) -> DomainResult<ReadyDonation> {
        self.ready.get_ready_donation(id).await?.ok_or_else(|| {
            warn!("Ready donation not found: {}", id);
            DomainError::not_found(format!("Ready donation not found: {}", id))
        })
    }

    pub async fn list_ready_donations(
        &self,
        filter: &ReadyDonationFilter,
    ) -> DomainResult<Vec<ReadyDonation>> {
        let all = self.ready.list_ready_donations().await?;
        let matching: Vec<ReadyDonation> = all.into_iter().filter(|r| filter.matches(r)).collect();
        debug!("{} ready donations match {:?}", matching.len(), filter);
        Ok(matching)
    }

    pub async fn approve_ready_donation(&self, id: &str) -> DomainResult<ReadyDonation> {
        info!("Approving ready donation {}", id);

        let _guard = self.write_gate.lock().await;
        let mut ready = self.get_ready_donation(id).await?;
        ensure_transition(&ready, ReadyDonationStatus::Approved)?;

        let now = now_rfc3339();
        let mut fields = Map::new();
        fields.insert("status".to_string(), encode(&ReadyDonationStatus::Approved)?);
        fields.insert("approvedAt".to_string(), json!(now));
        self.ready.update_fields(id, fields).await?;

        ready.status = ReadyDonationStatus::Approved;
        ready.approved_at = Some(now);
        info!("Approved ready donation {}", id);
        Ok(ready)
    }

    pub async fn reject_ready_donation(
        &self,
        id: &str,
        reason: Option<String>,
    ) -> DomainResult<ReadyDonation> {
        info!("Rejecting ready donation {}", id);

        let _guard = self.write_gate.lock().await;
        let mut ready = self.get_ready_donation(id).await?;
        ensure_transition(&ready, ReadyDonationStatus::Rejected)?;

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let now = now_rfc3339();
        let mut fields = Map::new();
        fields.insert("status".to_string(), encode(&ReadyDonationStatus::Rejected)?);
        fields.insert("rejectedAt".to_string(), json!(now));
        if let Some(reason) = &reason {
            fields.insert("rejectionReason".to_string(), json!(reason));
        }
        self.ready.update_fields(id, fields).await?;

        ready.status = ReadyDonationStatus::Rejected;
        ready.rejected_at = Some(now);
        ready.rejection_reason = reason;
        info!("Rejected ready donation {}", id);
        Ok(ready)
    }

    /// Claim an approved ready donation into the class's meal stock.
    ///
    /// The meal stock, the published donation's remaining students and the
    /// completed ready donation are committed in one atomic update. Claims
    /// into a date that already holds stock from the same donor add to it;
    /// stock from another donor is kept and the claim lands under the first
    /// free `{date}_{n}` id.
    pub async fn claim_ready_donation(
        &self,
        id: &str,
        target: ClaimTarget,
    ) -> DomainResult<ClaimOutcome> {
        info!("Claiming ready donation {} for teacher {}", id, target.teacher_id);

        require_non_empty(&target.teacher_id, "Teacher id")?;
        let base_date_id = match target.date_id.as_deref().map(str::trim) {
            Some(date_id) if !date_id.is_empty() => date_id.to_string(),
            _ => date_key(today()),
        };
        paths::validate_key(&base_date_id).map_err(|e| DomainError::validation(e.to_string()))?;

        let _guard = self.write_gate.lock().await;

        let mut ready = self.get_ready_donation(id).await?;
        ensure_transition(&ready, ReadyDonationStatus::Completed)?;
        let mut published = self.load_published(&ready.published_donation_id).await?;

        let now = now_rfc3339();
        let portion = portion_for(&published, ready.number_of_students);

        let (date_id, existing) = self
            .find_stock_slot(&ready, &published, &base_date_id)
            .await?;
        let stock = match existing {
            Some(mut stock) => {
                debug!(
                    "Merging claim into existing meal stock {} ({} students)",
                    stock.id, stock.coverage
                );
                stock.quantity += portion;
                stock.coverage += ready.number_of_students;
                if target.description.is_some() {
                    stock.description = target.description.clone();
                }
                stock
            }
            None => MealStock {
                id: date_id,
                school_id: ready.school_id.clone(),
                class_id: ready.class_id.clone(),
                meal_name: published.item_name.clone(),
                quantity: portion,
                unit: published.unit.clone(),
                coverage: ready.number_of_students,
                donor_id: published.donor_id.clone(),
                donor_name: published.donor_name.clone(),
                ready_donation_id: Some(ready.id.clone()),
                claimed_by: target.teacher_id.clone(),
                claimed_at: now.clone(),
                description: target.description.clone(),
            },
        };

        let mut now_fulfilled = false;
        if let Some(remaining) = published.remaining_students {
            let remaining = remaining.saturating_sub(ready.number_of_students);
            published.remaining_students = Some(remaining);
            if remaining == 0 && published.status != PublishedDonationStatus::Fulfilled {
                published.status = PublishedDonationStatus::Fulfilled;
                now_fulfilled = true;
            }
        }
        published.updated_at = now.clone();

        ready.status = ReadyDonationStatus::Completed;
        ready.completed_at = Some(now);
        ready.claimed_by = Some(target.teacher_id.clone());

        let published_path = paths::published_donation(&published.id);
        let mut batch = WriteBatch::new();
        batch.put(
            paths::meal_stock(&stock.school_id, &stock.class_id, &stock.id),
            &stock,
        )?;
        if let Some(remaining) = published.remaining_students {
            batch.put_value(format!("{}/remainingStudents", published_path), json!(remaining));
        }
        // Status is only written when this claim fulfils the listing
        if now_fulfilled {
            batch.put_value(format!("{}/status", published_path), encode(&published.status)?);
        }
        batch.put_value(format!("{}/updatedAt", published_path), json!(published.updated_at));
        batch.put(paths::ready_donation(&ready.id), &ready)?;
        batch.commit(self.store.as_ref()).await?;

        info!(
            "Ready donation {} claimed into meal stock {} ({} students, {:?} remaining)",
            ready.id, stock.id, stock.coverage, published.remaining_students
        );

        Ok(ClaimOutcome {
            ready_donation: ready,
            meal_stock: stock,
            published_donation: published,
        })
    }

    pub fn listen_to_ready_donations(
        &self,
        filter: ReadyDonationFilter,
        callback: impl Fn(Vec<ReadyDonation>) + Send + Sync + 'static,
    ) -> DomainResult<Subscription> {
        Ok(self.ready.listen(move |all| {
            callback(all.into_iter().filter(|r| filter.matches(r)).collect());
        })?)
    }

    async fn load_published(&self, id: &str) -> DomainResult<PublishedDonation> {
        self.published.get_donation(id).await?.ok_or_else(|| {
            warn!("Published donation not found: {}", id);
            DomainError::not_found(format!("Published donation not found: {}", id))
        })
    }

    /// First stock id at or after `base` that is free or already holds this donor's stock
    async fn find_stock_slot(
        &self,
        ready: &ReadyDonation,
        published: &PublishedDonation,
        base: &str,
    ) -> DomainResult<(String, Option<MealStock>)> {
        for n in 1..=MAX_STOCK_SUFFIX {
            let candidate = if n == 1 {
                base.to_string()
            } else {
                format!("{}_{}", base, n)
            };
            match self
                .meal_stock
                .get_stock(&ready.school_id, &ready.class_id, &candidate)
                .await?
            {
                None => return Ok((candidate, None)),
                Some(stock) if stock.donor_id == published.donor_id => {
                    return Ok((candidate, Some(stock)))
                }
                Some(_) => continue,
            }
        }
        Err(DomainError::invalid_state(format!(
            "No free meal stock slot for {} in class {}",
            base, ready.class_id
        )))
    }
}

fn ensure_transition(ready: &ReadyDonation, next: ReadyDonationStatus) -> DomainResult<()> {
    if ready.status.can_transition_to(next) {
        Ok(())
    } else {
        warn!(
            "Rejected transition of ready donation {}: {} -> {}",
            ready.id, ready.status, next
        );
        Err(DomainError::invalid_state(format!(
            "Ready donation {} is {} and cannot become {}",
            ready.id, ready.status, next
        )))
    }
}

/// Share of the published quantity that covers `students`
fn portion_for(published: &PublishedDonation, students: u32) -> f64 {
    match published.number_of_students {
        Some(capacity) if capacity > 0 => {
            published.quantity * f64::from(students) / f64::from(capacity)
        }
        _ => published.quantity,
    }
}
