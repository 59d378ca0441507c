use log::{debug, info, warn};
use std::sync::Arc;

use shared::{
    AccessCodeIndexEntry, CreateStudentRequest, StudentProfile, UpdateStudentRequest,
};

use super::access_code::generate_access_code;
use super::errors::{DomainError, DomainResult};
use super::validation::{
    age_on, now_rfc3339, parse_date, require_max_length, require_non_empty, today,
};
use super::WriteGate;
use crate::storage::paths;
use crate::storage::repositories::{StudentRecord, StudentRepository, WriteBatch};
use crate::storage::traits::DocumentStore;

/// Draws before giving up on finding an unused access code
const MAX_CODE_ATTEMPTS: usize = 10;
const MAX_NAME_LENGTH: usize = 100;

/// Teacher-managed student roster and the access codes parents log in with
#[derive(Clone)]
pub struct StudentService {
    store: Arc<dyn DocumentStore>,
    repository: StudentRepository,
    write_gate: WriteGate,
}

impl StudentService {
    pub fn new(store: Arc<dyn DocumentStore>, write_gate: WriteGate) -> Self {
        Self {
            repository: StudentRepository::new(store.clone()),
            store,
            write_gate,
        }
    }

    /// Add a student under a teacher and issue a fresh access code.
    /// The profile and its index entry are written together.
    pub async fn create_student(
        &self,
        teacher_id: &str,
        request: CreateStudentRequest,
    ) -> DomainResult<StudentRecord> {
        info!("Creating student: teacher={}, name={}", teacher_id, request.name);

        // Validate the request
        validate_teacher_id(teacher_id)?;
        require_non_empty(&request.name, "Student name")?;
        require_max_length(request.name.trim(), MAX_NAME_LENGTH, "Student name")?;
        require_non_empty(&request.student_id, "Student id")?;
        require_non_empty(&request.parent_name, "Parent name")?;
        let age = validate_date_of_birth(&request.date_of_birth)?;

        let _guard = self.write_gate.lock().await;

        let student_key = self.repository.next_key(teacher_id).await?;
        let code = self.issue_unique_code().await?;

        let student = StudentProfile {
            student_id: request.student_id.trim().to_string(),
            name: request.name.trim().to_string(),
            date_of_birth: request.date_of_birth.trim().to_string(),
            age,
            grade: request.grade.trim().to_string(),
            class_id: non_blank(request.class_id),
            school_id: non_blank(request.school_id),
            parent_name: request.parent_name.trim().to_string(),
            parent_contact: request.parent_contact.trim().to_string(),
            parent_email: request.parent_email.trim().to_string(),
            allergies: request.allergies,
            meal_feedbacks: String::new(),
            parent_access_token: code.clone(),
            created_at: now_rfc3339(),
            meal_served_today: false,
        };

        let mut batch = WriteBatch::new();
        batch.put(paths::student(teacher_id, &student_key), &student)?;
        batch.put(
            paths::access_code(&code),
            &AccessCodeIndexEntry {
                teacher_id: teacher_id.to_string(),
                student_key: student_key.clone(),
            },
        )?;
        batch.commit(self.store.as_ref()).await?;

        info!("Created student {} ({}) for teacher {}", student.name, student_key, teacher_id);
        Ok(StudentRecord {
            teacher_id: teacher_id.to_string(),
            student_key,
            student,
        })
    }

    pub async fn get_student(&self, teacher_id: &str, student_key: &str) -> DomainResult<StudentRecord> {
        match self.repository.get_student(teacher_id, student_key).await? {
            Some(student) => Ok(StudentRecord {
                teacher_id: teacher_id.to_string(),
                student_key: student_key.to_string(),
                student,
            }),
            None => {
                warn!("Student not found: {}/{}", teacher_id, student_key);
                Err(DomainError::not_found(format!(
                    "Student {} not found for teacher {}",
                    student_key, teacher_id
                )))
            }
        }
    }

    /// A teacher's students ordered by name
    pub async fn list_students(&self, teacher_id: &str) -> DomainResult<Vec<StudentRecord>> {
        let students = self.repository.list_for_teacher(teacher_id).await?;
        debug!("Teacher {} has {} students", teacher_id, students.len());
        Ok(students)
    }

    /// Update teacher-owned fields. Fields left as `None` are kept.
    pub async fn update_student(
        &self,
        teacher_id: &str,
        student_key: &str,
        request: UpdateStudentRequest,
    ) -> DomainResult<StudentRecord> {
        info!("Updating student {}/{}", teacher_id, student_key);

        if let Some(name) = &request.name {
            require_non_empty(name, "Student name")?;
            require_max_length(name.trim(), MAX_NAME_LENGTH, "Student name")?;
        }
        if let Some(parent_name) = &request.parent_name {
            require_non_empty(parent_name, "Parent name")?;
        }
        let age = match &request.date_of_birth {
            Some(dob) => Some(validate_date_of_birth(dob)?),
            None => None,
        };

        let _guard = self.write_gate.lock().await;
        let mut record = self.get_student(teacher_id, student_key).await?;
        let student = &mut record.student;

        if let Some(name) = request.name {
            student.name = name.trim().to_string();
        }
        if let (Some(dob), Some(age)) = (request.date_of_birth, age) {
            student.date_of_birth = dob.trim().to_string();
            student.age = age;
        }
        if let Some(grade) = request.grade {
            student.grade = grade.trim().to_string();
        }
        if let Some(class_id) = request.class_id {
            student.class_id = non_blank(Some(class_id));
        }
        if let Some(school_id) = request.school_id {
            student.school_id = non_blank(Some(school_id));
        }
        if let Some(parent_name) = request.parent_name {
            student.parent_name = parent_name.trim().to_string();
        }
        if let Some(parent_contact) = request.parent_contact {
            student.parent_contact = parent_contact.trim().to_string();
        }
        if let Some(parent_email) = request.parent_email {
            student.parent_email = parent_email.trim().to_string();
        }

        let mut batch = WriteBatch::new();
        batch.put(paths::student(teacher_id, student_key), &record.student)?;
        batch.commit(self.store.as_ref()).await?;

        info!("Updated student {}/{}", teacher_id, student_key);
        Ok(record)
    }

    /// Remove a student and the index entry for their access code
    pub async fn delete_student(&self, teacher_id: &str, student_key: &str) -> DomainResult<StudentRecord> {
        info!("Deleting student {}/{}", teacher_id, student_key);

        let _guard = self.write_gate.lock().await;
        let record = self.get_student(teacher_id, student_key).await?;

        let mut batch = WriteBatch::new();
        batch.delete(paths::student(teacher_id, student_key));
        if self.index_points_to(&record).await? {
            batch.delete(paths::access_code(&record.student.parent_access_token));
        }
        batch.commit(self.store.as_ref()).await?;

        info!("Deleted student {} ({})", record.student.name, student_key);
        Ok(record)
    }

    /// Replace a student's access code. The old code stops working in the
    /// same write that activates the new one.
    pub async fn regenerate_access_code(
        &self,
        teacher_id: &str,
        student_key: &str,
    ) -> DomainResult<StudentRecord> {
        info!("Regenerating access code for student {}/{}", teacher_id, student_key);

        let _guard = self.write_gate.lock().await;
        let mut record = self.get_student(teacher_id, student_key).await?;
        let code = self.issue_unique_code().await?;

        let mut batch = WriteBatch::new();
        if self.index_points_to(&record).await? {
            batch.delete(paths::access_code(&record.student.parent_access_token));
        }
        batch.put_value(
            format!("{}/parentAccessToken", paths::student(teacher_id, student_key)),
            serde_json::Value::String(code.clone()),
        );
        batch.put(
            paths::access_code(&code),
            &AccessCodeIndexEntry {
                teacher_id: teacher_id.to_string(),
                student_key: student_key.to_string(),
            },
        )?;
        batch.commit(self.store.as_ref()).await?;

        record.student.parent_access_token = code;
        Ok(record)
    }

    /// Write index entries for students whose code is not indexed yet.
    /// Returns the number of entries added.
    pub async fn rebuild_access_code_index(&self) -> DomainResult<usize> {
        let _guard = self.write_gate.lock().await;
        let students = self.repository.list_all().await?;

        let mut batch = WriteBatch::new();
        for record in &students {
            let code = record.student.parent_access_token.trim();
            if paths::validate_key(code).is_err() {
                continue;
            }
            if self.repository.get_index_entry(code).await?.is_none() {
                batch.put(
                    paths::access_code(code),
                    &AccessCodeIndexEntry {
                        teacher_id: record.teacher_id.clone(),
                        student_key: record.student_key.clone(),
                    },
                )?;
            }
        }

        let added = batch.len();
        batch.commit(self.store.as_ref()).await?;
        if added > 0 {
            info!("Indexed {} unindexed access codes", added);
        }
        Ok(added)
    }

    async fn issue_unique_code(&self) -> DomainResult<String> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = generate_access_code();
            if self.repository.get_index_entry(&code).await?.is_none() {
                return Ok(code);
            }
            debug!("Access code collision on attempt {}", attempt);
        }
        Err(DomainError::invalid_state(
            "Could not issue a unique access code; try again",
        ))
    }

    async fn index_points_to(&self, record: &StudentRecord) -> DomainResult<bool> {
        let entry = self
            .repository
            .get_index_entry(&record.student.parent_access_token)
            .await?;
        Ok(entry.is_some_and(|e| {
            e.teacher_id == record.teacher_id && e.student_key == record.student_key
        }))
    }
}

fn validate_teacher_id(teacher_id: &str) -> DomainResult<()> {
    paths::validate_key(teacher_id)
        .map_err(|_| DomainError::validation(format!("Invalid teacher id: {:?}", teacher_id)))
}

/// Parse a date of birth and derive the current age
fn validate_date_of_birth(value: &str) -> DomainResult<u32> {
    let dob = parse_date(value, "Date of birth")?;
    let now = today();
    if dob > now {
        return Err(DomainError::validation("Date of birth cannot be in the future"));
    }
    Ok(age_on(dob, now))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
