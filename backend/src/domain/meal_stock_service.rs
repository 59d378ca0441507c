use log::{info, warn};
use std::sync::Arc;

use shared::MealStock;

use super::errors::{DomainError, DomainResult};
use super::WriteGate;
use crate::storage::repositories::MealStockRepository;
use crate::storage::traits::{DocumentStore, Subscription};

/// Per-class meal stock produced by claims
#[derive(Clone)]
pub struct MealStockService {
    repository: MealStockRepository,
    write_gate: WriteGate,
}

impl MealStockService {
    pub fn new(store: Arc<dyn DocumentStore>, write_gate: WriteGate) -> Self {
        Self {
            repository: MealStockRepository::new(store),
            write_gate,
        }
    }

    pub async fn list_class_stock(
        &self,
        school_id: &str,
        class_id: &str,
    ) -> DomainResult<Vec<MealStock>> {
        Ok(self.repository.list_for_class(school_id, class_id).await?)
    }

    pub async fn get_meal_stock(
        &self,
        school_id: &str,
        class_id: &str,
        date_id: &str,
    ) -> DomainResult<MealStock> {
        self.repository
            .get_stock(school_id, class_id, date_id)
            .await?
            .ok_or_else(|| {
                warn!("Meal stock not found: {}/{}/{}", school_id, class_id, date_id);
                DomainError::not_found(format!(
                    "Meal stock {} not found for class {}",
                    date_id, class_id
                ))
            })
    }

    /// Reduce the student coverage of a stock entry, never below zero.
    /// The quantity is left as claimed.
    pub async fn decrease_meal_stock(
        &self,
        school_id: &str,
        class_id: &str,
        date_id: &str,
        amount: u32,
    ) -> DomainResult<MealStock> {
        info!(
            "Decreasing meal stock {}/{}/{} by {}",
            school_id, class_id, date_id, amount
        );

        if amount == 0 {
            return Err(DomainError::validation("Decrease amount must be at least 1"));
        }

        let _guard = self.write_gate.lock().await;
        let mut stock = self.get_meal_stock(school_id, class_id, date_id).await?;
        stock.coverage = stock.coverage.saturating_sub(amount);
        self.repository
            .update_coverage(school_id, class_id, date_id, stock.coverage)
            .await?;

        info!("Meal stock {} now covers {} students", date_id, stock.coverage);
        Ok(stock)
    }

    pub async fn delete_meal_stock(
        &self,
        school_id: &str,
        class_id: &str,
        date_id: &str,
    ) -> DomainResult<()> {
        info!("Deleting meal stock {}/{}/{}", school_id, class_id, date_id);

        let _guard = self.write_gate.lock().await;
        self.get_meal_stock(school_id, class_id, date_id).await?;
        self.repository.delete_stock(school_id, class_id, date_id).await?;
        Ok(())
    }

    pub fn listen_to_class_stock(
        &self,
        school_id: &str,
        class_id: &str,
        callback: impl Fn(Vec<MealStock>) + Send + Sync + 'static,
    ) -> DomainResult<Subscription> {
        Ok(self.repository.listen_class(school_id, class_id, callback)?)
    }
}
