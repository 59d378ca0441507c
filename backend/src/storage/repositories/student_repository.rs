//! Student profiles, scoped under the owning teacher, plus the access-code index.
//!
//! ```text
//! students/{teacherId}/{studentKey}   StudentProfile
//! accessCodes/{code}                  { teacherId, studentKey }
//! ```

use anyhow::Result;
use log::{debug, warn};
use serde_json::{Map, Value};
use shared::{AccessCodeIndexEntry, StudentProfile};
use std::sync::Arc;

use super::{decode, decode_children};
use crate::storage::paths;
use crate::storage::traits::DocumentStore;

/// A student together with where it is stored
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub teacher_id: String,
    pub student_key: String,
    pub student: StudentProfile,
}

#[derive(Clone)]
pub struct StudentRepository {
    store: Arc<dyn DocumentStore>,
}

impl StudentRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn next_key(&self, teacher_id: &str) -> Result<String> {
        paths::validate_key(teacher_id)?;
        self.store.push(&paths::teacher_students(teacher_id)).await
    }

    pub async fn get_student(
        &self,
        teacher_id: &str,
        student_key: &str,
    ) -> Result<Option<StudentProfile>> {
        if paths::validate_key(teacher_id).is_err() || paths::validate_key(student_key).is_err() {
            return Ok(None);
        }
        match self.store.get(&paths::student(teacher_id, student_key)).await? {
            Some(value) => Ok(Some(decode(value)?)),
            None => Ok(None),
        }
    }

    /// A teacher's students ordered by name
    pub async fn list_for_teacher(&self, teacher_id: &str) -> Result<Vec<StudentRecord>> {
        if paths::validate_key(teacher_id).is_err() {
            return Ok(Vec::new());
        }
        let value = self.store.get(&paths::teacher_students(teacher_id)).await?;
        let mut records: Vec<StudentRecord> = decode_children::<StudentProfile>(value)
            .into_iter()
            .map(|(student_key, student)| StudentRecord {
                teacher_id: teacher_id.to_string(),
                student_key,
                student,
            })
            .collect();
        records.sort_by(|a, b| a.student.name.cmp(&b.student.name));
        Ok(records)
    }

    /// Every student of every teacher. Reads the whole `students` tree.
    pub async fn list_all(&self) -> Result<Vec<StudentRecord>> {
        let Some(Value::Object(teachers)) = self.store.get(paths::STUDENTS).await? else {
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        for (teacher_id, students) in teachers {
            for (student_key, student) in decode_children::<StudentProfile>(Some(students)) {
                records.push(StudentRecord {
                    teacher_id: teacher_id.clone(),
                    student_key,
                    student,
                });
            }
        }
        debug!("Scanned {} students across all teachers", records.len());
        Ok(records)
    }

    pub async fn get_index_entry(&self, code: &str) -> Result<Option<AccessCodeIndexEntry>> {
        if paths::validate_key(code).is_err() {
            return Ok(None);
        }
        match self.store.get(&paths::access_code(code)).await? {
            Some(value) => match decode(value) {
                Ok(entry) => Ok(Some(entry)),
                Err(e) => {
                    warn!("Ignoring malformed access code index entry: {}", e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    pub async fn update_fields(
        &self,
        teacher_id: &str,
        student_key: &str,
        fields: Map<String, Value>,
    ) -> Result<()> {
        paths::validate_key(teacher_id)?;
        paths::validate_key(student_key)?;
        self.store
            .update(&paths::student(teacher_id, student_key), fields)
            .await
    }
}
