//! Parent login with a student access code.
//!
//! A code resolves to exactly one student through the `accessCodes` index.
//! Students written before the index existed are still found by scanning
//! every teacher's roster. A successful login is cached in local storage so
//! the parent stays signed in across restarts.

use log::{debug, info, warn};
use std::sync::Arc;

use shared::ParentSession;

use super::access_code::validate_access_code;
use super::errors::{DomainError, DomainResult};
use super::validation::now_rfc3339;
use crate::storage::repositories::{StudentRecord, StudentRepository};
use crate::storage::traits::{DocumentStore, LocalStorage};

pub const PARENT_SESSION_KEY: &str = "parentSession";
pub const PARENT_ACCESS_CODE_KEY: &str = "parentAccessCode";

const INVALID_FORMAT_MESSAGE: &str =
    "Invalid code format. Access codes are 7 capital letters followed by one of $ @ # *";
const UNKNOWN_CODE_MESSAGE: &str = "Invalid access code. Please check the code and try again.";

#[derive(Clone)]
pub struct ParentAuthService {
    students: StudentRepository,
    local_storage: Arc<dyn LocalStorage>,
}

impl ParentAuthService {
    pub fn new(store: Arc<dyn DocumentStore>, local_storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            students: StudentRepository::new(store),
            local_storage,
        }
    }

    /// Resolve a code to a session without touching local storage
    pub async fn authenticate(&self, code: &str) -> DomainResult<ParentSession> {
        let code = code.trim();
        if !validate_access_code(code) {
            debug!("Rejected malformed access code");
            return Err(DomainError::Format(INVALID_FORMAT_MESSAGE.to_string()));
        }

        let record = self.resolve(code).await?.ok_or_else(|| {
            warn!("Access code did not match any student");
            DomainError::not_found(UNKNOWN_CODE_MESSAGE)
        })?;

        Ok(ParentSession {
            teacher_id: record.teacher_id,
            student_key: record.student_key,
            student: record.student,
            login_time: now_rfc3339(),
        })
    }

    /// Resolve a code and persist the resulting session on this device
    pub async fn login_with_access_code(&self, code: &str) -> DomainResult<ParentSession> {
        let session = self.authenticate(code).await?;

        let serialized = serde_json::to_string(&session)
            .map_err(|e| DomainError::Storage(anyhow::Error::new(e)))?;
        self.local_storage
            .set_item(PARENT_SESSION_KEY, &serialized)
            .await
            .map_err(DomainError::Storage)?;
        self.local_storage
            .set_item(PARENT_ACCESS_CODE_KEY, code.trim())
            .await
            .map_err(DomainError::Storage)?;

        info!(
            "Parent logged in for student {}/{}",
            session.teacher_id, session.student_key
        );
        Ok(session)
    }

    /// The cached session, or `None` when absent or unreadable
    pub async fn get_parent_session(&self) -> Option<ParentSession> {
        let raw = match self.local_storage.get_item(PARENT_SESSION_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read parent session: {:#}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Discarding unreadable parent session: {}", e);
                None
            }
        }
    }

    /// The cached session, but only for the parent presenting `code`.
    ///
    /// The code must match both the cached code and the student's current
    /// token, so a regenerated code retires the cached session too. The
    /// returned session carries the current student profile.
    pub async fn stored_session_for(&self, code: &str) -> DomainResult<Option<ParentSession>> {
        let code = code.trim();
        let Some(session) = self.get_parent_session().await else {
            return Ok(None);
        };

        let stored_code = self
            .local_storage
            .get_item(PARENT_ACCESS_CODE_KEY)
            .await
            .map_err(DomainError::Storage)?;
        if stored_code.as_deref() != Some(code) || session.student.parent_access_token != code {
            debug!("Cached parent session does not belong to the presented code");
            return Ok(None);
        }

        match self.resolve(code).await? {
            Some(current)
                if current.teacher_id == session.teacher_id
                    && current.student_key == session.student_key =>
            {
                Ok(Some(ParentSession {
                    student: current.student,
                    ..session
                }))
            }
            _ => {
                warn!(
                    "Cached parent session for {}/{} no longer matches its access code",
                    session.teacher_id, session.student_key
                );
                Ok(None)
            }
        }
    }

    pub async fn is_parent_logged_in(&self) -> bool {
        self.get_parent_session().await.is_some()
    }

    pub async fn logout_parent(&self) -> DomainResult<()> {
        self.local_storage
            .remove_items(&[PARENT_SESSION_KEY, PARENT_ACCESS_CODE_KEY])
            .await
            .map_err(DomainError::Storage)?;
        info!("Parent logged out");
        Ok(())
    }

    async fn resolve(&self, code: &str) -> DomainResult<Option<StudentRecord>> {
        if let Some(entry) = self.students.get_index_entry(code).await? {
            match self
                .students
                .get_student(&entry.teacher_id, &entry.student_key)
                .await?
            {
                Some(student) if student.parent_access_token == code => {
                    return Ok(Some(StudentRecord {
                        teacher_id: entry.teacher_id,
                        student_key: entry.student_key,
                        student,
                    }));
                }
                _ => warn!(
                    "Stale access code index entry for {}/{}",
                    entry.teacher_id, entry.student_key
                ),
            }
        }

        debug!("Access code not indexed; scanning all students");
        let found = self
            .students
            .list_all()
            .await?
            .into_iter()
            .find(|record| record.student.parent_access_token == code);
        Ok(found)
    }
}
