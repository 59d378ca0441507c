//! Input checks shared by the services.

use chrono::{Datelike, Local, NaiveDate, Utc};
use shared::DATE_FORMAT;

use super::errors::{DomainError, DomainResult};

/// Current time as an RFC 3339 timestamp
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Today's calendar date in the server's local time zone
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn require_non_empty(value: &str, field: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{} cannot be empty", field)));
    }
    Ok(())
}

pub fn require_max_length(value: &str, max: usize, field: &str) -> DomainResult<()> {
    if value.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{} cannot exceed {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str, field: &str) -> DomainResult<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.len() != 10 {
        return Err(DomainError::validation(format!(
            "{} must be in YYYY-MM-DD format",
            field
        )));
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| {
        DomainError::validation(format!("{} is not a valid date: {}", field, value))
    })
}

pub fn require_positive_amount(amount: f64, field: &str) -> DomainResult<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(DomainError::validation(format!("{} must be positive", field)));
    }
    Ok(())
}

/// Whole years between `date_of_birth` and `on`
pub fn age_on(date_of_birth: NaiveDate, on: NaiveDate) -> u32 {
    let mut years = on.year() - date_of_birth.year();
    if (on.month(), on.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }
    years.max(0) as u32
}
