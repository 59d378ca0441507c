use chrono::NaiveDate;
use log::{debug, info};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

use shared::{date_key, MealTrackingRecord};

use super::commands::meal_service::RecordMealServiceCommand;
use super::errors::{DomainError, DomainResult};
use super::validation::{now_rfc3339, require_non_empty};
use super::WriteGate;
use crate::storage::paths;
use crate::storage::repositories::{
    MealStockRepository, MealTrackingRepository, StudentRepository, WriteBatch,
};
use crate::storage::traits::DocumentStore;

/// Daily meal service: who was served what, drawn from which stock
#[derive(Clone)]
pub struct MealTrackingService {
    store: Arc<dyn DocumentStore>,
    tracking: MealTrackingRepository,
    students: StudentRepository,
    meal_stock: MealStockRepository,
    write_gate: WriteGate,
}

impl MealTrackingService {
    pub fn new(store: Arc<dyn DocumentStore>, write_gate: WriteGate) -> Self {
        Self {
            tracking: MealTrackingRepository::new(store.clone()),
            students: StudentRepository::new(store.clone()),
            meal_stock: MealStockRepository::new(store.clone()),
            store,
            write_gate,
        }
    }

    /// Record a meal served by a teacher.
    ///
    /// Marks each served student, and when a meal stock is named, takes the
    /// served count off its coverage (floored at 0). All writes land together.
    pub async fn record_meal_service(
        &self,
        command: RecordMealServiceCommand,
    ) -> DomainResult<MealTrackingRecord> {
        info!(
            "Recording meal service: teacher={}, meal={}, served={}",
            command.teacher_id,
            command.meal_name,
            command.served_student_keys.len()
        );

        require_non_empty(&command.teacher_id, "Teacher id")?;
        require_non_empty(&command.meal_name, "Meal name")?;

        let mut seen = HashSet::new();
        let served: Vec<String> = command
            .served_student_keys
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && seen.insert(k.clone()))
            .collect();

        let _guard = self.write_gate.lock().await;

        for student_key in &served {
            if self
                .students
                .get_student(&command.teacher_id, student_key)
                .await?
                .is_none()
            {
                return Err(DomainError::not_found(format!(
                    "Student {} not found for teacher {}",
                    student_key, command.teacher_id
                )));
            }
        }

        let mut batch = WriteBatch::new();

        if let Some(stock_id) = &command.meal_stock_id {
            let (Some(school_id), Some(class_id)) = (&command.school_id, &command.class_id) else {
                return Err(DomainError::validation(
                    "School and class are required when drawing from meal stock",
                ));
            };
            let stock = self
                .meal_stock
                .get_stock(school_id, class_id, stock_id)
                .await?
                .ok_or_else(|| {
                    DomainError::not_found(format!(
                        "Meal stock {} not found for class {}",
                        stock_id, class_id
                    ))
                })?;
            let served_count = u32::try_from(served.len()).unwrap_or(u32::MAX);
            let coverage = stock.coverage.saturating_sub(served_count);
            debug!("Meal stock {} coverage {} -> {}", stock.id, stock.coverage, coverage);
            batch.put_value(
                format!("{}/coverage", paths::meal_stock(school_id, class_id, stock_id)),
                json!(coverage),
            );
        }

        let record = MealTrackingRecord {
            id: self.tracking.next_id(&command.teacher_id).await?,
            teacher_id: command.teacher_id.clone(),
            school_id: command.school_id.clone(),
            class_id: command.class_id.clone(),
            date: date_key(command.date),
            meal_name: command.meal_name.trim().to_string(),
            served_student_keys: served,
            meal_stock_id: command.meal_stock_id.clone(),
            recorded_at: now_rfc3339(),
        };

        for student_key in &record.served_student_keys {
            batch.put_value(
                format!(
                    "{}/mealServedToday",
                    paths::student(&command.teacher_id, student_key)
                ),
                json!(true),
            );
        }
        batch.put(
            MealTrackingRepository::record_path(&record.teacher_id, &record.id),
            &record,
        )?;
        batch.commit(self.store.as_ref()).await?;

        info!(
            "Recorded meal service {} for {} students",
            record.id,
            record.served_student_keys.len()
        );
        Ok(record)
    }

    /// Clear `mealServedToday` on every student of a teacher.
    /// Returns how many flags were cleared.
    pub async fn reset_daily_flags(&self, teacher_id: &str) -> DomainResult<usize> {
        info!("Resetting daily meal flags for teacher {}", teacher_id);

        let _guard = self.write_gate.lock().await;
        let students = self.students.list_for_teacher(teacher_id).await?;

        let mut batch = WriteBatch::new();
        for record in students.iter().filter(|r| r.student.meal_served_today) {
            batch.put_value(
                format!(
                    "{}/mealServedToday",
                    paths::student(teacher_id, &record.student_key)
                ),
                json!(false),
            );
        }
        let cleared = batch.len();
        batch.commit(self.store.as_ref()).await?;

        debug!("Cleared {} meal flags", cleared);
        Ok(cleared)
    }

    /// A teacher's meal records, oldest first
    pub async fn list_records(&self, teacher_id: &str) -> DomainResult<Vec<MealTrackingRecord>> {
        Ok(self.tracking.list_for_teacher(teacher_id).await?)
    }

    /// First record on `date` that applies to a student in `class_id`.
    /// Records without a class apply to every class.
    pub async fn meal_for_date(
        &self,
        teacher_id: &str,
        class_id: Option<&str>,
        date: NaiveDate,
    ) -> DomainResult<Option<MealTrackingRecord>> {
        let key = date_key(date);
        let records = self.tracking.list_for_teacher(teacher_id).await?;
        let found = records.into_iter().find(|record| {
            record.date.starts_with(&key)
                && match (record.class_id.as_deref(), class_id) {
                    (Some(recorded), Some(wanted)) => recorded == wanted,
                    _ => true,
                }
        });
        if found.is_none() {
            debug!("No meal recorded by teacher {} on {}", teacher_id, key);
        }
        Ok(found)
    }
}
