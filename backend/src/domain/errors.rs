//! Error kinds surfaced by every domain operation.
//!
//! Callers (the REST layer, or an embedding UI) match on the variant to pick a
//! message or status code; the `kind()` string is stable across releases.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Caller input failed a format or range check. Raised before any write.
    #[error("{0}")]
    Validation(String),

    /// An access code does not have the `[A-Z]{7}[$@#*]` shape
    #[error("{0}")]
    Format(String),

    #[error("{0}")]
    NotFound(String),

    /// The entity exists but its status forbids the requested transition
    #[error("{0}")]
    InvalidState(String),

    #[error("Document store error: {0:#}")]
    Store(#[from] anyhow::Error),

    /// Device-side persistence (parent session cache) failed
    #[error("Local storage error: {0:#}")]
    Storage(#[source] anyhow::Error),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        DomainError::NotFound(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        DomainError::InvalidState(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::Format(_) => "format_error",
            DomainError::NotFound(_) => "not_found",
            DomainError::InvalidState(_) => "invalid_state",
            DomainError::Store(_) => "store_error",
            DomainError::Storage(_) => "storage_error",
        }
    }
}

pub type DomainResult<T> = std::result::Result<T, DomainError>;
