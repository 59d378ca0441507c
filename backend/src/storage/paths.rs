//! Collection layout of the document store.
//!
//! ```text
//! publishedDonations/{id}
//! donationRequests/{id}
//! donationPayments/{requestId}/{key}
//! readyDonations/{id}
//! classes/{schoolId}/{classId}/meals/{dateId}
//! students/{teacherId}/{studentKey}
//! accessCodes/{code}
//! mealTracking/{teacherId}/{key}
//! donorRatings/{donorId}/{ratingId}
//! ```

use anyhow::{bail, Result};

pub const PUBLISHED_DONATIONS: &str = "publishedDonations";
pub const DONATION_REQUESTS: &str = "donationRequests";
pub const DONATION_PAYMENTS: &str = "donationPayments";
pub const READY_DONATIONS: &str = "readyDonations";
pub const CLASSES: &str = "classes";
pub const STUDENTS: &str = "students";
pub const ACCESS_CODES: &str = "accessCodes";
pub const MEAL_TRACKING: &str = "mealTracking";
pub const DONOR_RATINGS: &str = "donorRatings";

/// Split a path into its non-empty segments
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Reject keys that would escape their collection
pub fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        bail!("Document key cannot be empty");
    }
    if key.contains('/') {
        bail!("Document key cannot contain '/': {}", key);
    }
    Ok(())
}

pub fn published_donation(id: &str) -> String {
    format!("{}/{}", PUBLISHED_DONATIONS, id)
}

pub fn donation_request(id: &str) -> String {
    format!("{}/{}", DONATION_REQUESTS, id)
}

pub fn donation_payments(request_id: &str) -> String {
    format!("{}/{}", DONATION_PAYMENTS, request_id)
}

pub fn ready_donation(id: &str) -> String {
    format!("{}/{}", READY_DONATIONS, id)
}

pub fn class_meals(school_id: &str, class_id: &str) -> String {
    format!("{}/{}/{}/meals", CLASSES, school_id, class_id)
}

pub fn meal_stock(school_id: &str, class_id: &str, date_id: &str) -> String {
    format!("{}/{}", class_meals(school_id, class_id), date_id)
}

pub fn teacher_students(teacher_id: &str) -> String {
    format!("{}/{}", STUDENTS, teacher_id)
}

pub fn student(teacher_id: &str, student_key: &str) -> String {
    format!("{}/{}/{}", STUDENTS, teacher_id, student_key)
}

pub fn access_code(code: &str) -> String {
    format!("{}/{}", ACCESS_CODES, code)
}

pub fn teacher_meal_tracking(teacher_id: &str) -> String {
    format!("{}/{}", MEAL_TRACKING, teacher_id)
}

pub fn donor_ratings(donor_id: &str) -> String {
    format!("{}/{}", DONOR_RATINGS, donor_id)
}
