use anyhow::Result;
use serde_json::{json, Map};
use shared::MealStock;
use std::sync::Arc;

use super::{decode, decode_children, encode, listen_collection};
use crate::storage::paths;
use crate::storage::traits::{DocumentStore, Subscription};

/// Meal stock per class and date, `classes/{schoolId}/{classId}/meals/{dateId}`
#[derive(Clone)]
pub struct MealStockRepository {
    store: Arc<dyn DocumentStore>,
}

impl MealStockRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get_stock(
        &self,
        school_id: &str,
        class_id: &str,
        date_id: &str,
    ) -> Result<Option<MealStock>> {
        if [school_id, class_id, date_id]
            .iter()
            .any(|key| paths::validate_key(key).is_err())
        {
            return Ok(None);
        }
        match self
            .store
            .get(&paths::meal_stock(school_id, class_id, date_id))
            .await?
        {
            Some(value) => Ok(Some(decode(value)?)),
            None => Ok(None),
        }
    }

    /// Stock for one class, ordered by date id
    pub async fn list_for_class(&self, school_id: &str, class_id: &str) -> Result<Vec<MealStock>> {
        if paths::validate_key(school_id).is_err() || paths::validate_key(class_id).is_err() {
            return Ok(Vec::new());
        }
        let value = self.store.get(&paths::class_meals(school_id, class_id)).await?;
        let mut stock: Vec<MealStock> = decode_children(value)
            .into_iter()
            .map(|(_, item)| item)
            .collect();
        stock.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(stock)
    }

    pub async fn store_stock(&self, stock: &MealStock) -> Result<()> {
        paths::validate_key(&stock.id)?;
        self.store
            .set(
                &paths::meal_stock(&stock.school_id, &stock.class_id, &stock.id),
                encode(stock)?,
            )
            .await
    }

    pub async fn update_coverage(
        &self,
        school_id: &str,
        class_id: &str,
        date_id: &str,
        coverage: u32,
    ) -> Result<()> {
        let mut fields = Map::new();
        fields.insert("coverage".to_string(), json!(coverage));
        self.store
            .update(&paths::meal_stock(school_id, class_id, date_id), fields)
            .await
    }

    pub async fn delete_stock(&self, school_id: &str, class_id: &str, date_id: &str) -> Result<()> {
        paths::validate_key(date_id)?;
        self.store
            .remove(&paths::meal_stock(school_id, class_id, date_id))
            .await
    }

    pub fn listen_class(
        &self,
        school_id: &str,
        class_id: &str,
        callback: impl Fn(Vec<MealStock>) + Send + Sync + 'static,
    ) -> Result<Subscription> {
        listen_collection(&self.store, &paths::class_meals(school_id, class_id), callback)
    }
}
