use anyhow::Result;
use shared::MealTrackingRecord;
use std::sync::Arc;

use super::{decode_children, encode};
use crate::storage::paths;
use crate::storage::traits::DocumentStore;

/// Meal service records, `mealTracking/{teacherId}/{key}`
#[derive(Clone)]
pub struct MealTrackingRepository {
    store: Arc<dyn DocumentStore>,
}

impl MealTrackingRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn next_id(&self, teacher_id: &str) -> Result<String> {
        paths::validate_key(teacher_id)?;
        self.store.push(&paths::teacher_meal_tracking(teacher_id)).await
    }

    pub fn record_path(teacher_id: &str, record_id: &str) -> String {
        format!("{}/{}", paths::teacher_meal_tracking(teacher_id), record_id)
    }

    pub async fn store_record(&self, record: &MealTrackingRecord) -> Result<()> {
        paths::validate_key(&record.id)?;
        self.store
            .set(&Self::record_path(&record.teacher_id, &record.id), encode(record)?)
            .await
    }

    /// A teacher's records in the order they were written
    pub async fn list_for_teacher(&self, teacher_id: &str) -> Result<Vec<MealTrackingRecord>> {
        if paths::validate_key(teacher_id).is_err() {
            return Ok(Vec::new());
        }
        let value = self.store.get(&paths::teacher_meal_tracking(teacher_id)).await?;
        let mut records: Vec<MealTrackingRecord> = decode_children(value)
            .into_iter()
            .map(|(_, record)| record)
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }
}
