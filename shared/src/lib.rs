use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calendar date format used for availability windows, target dates and meal-stock keys
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format a calendar date as a `YYYY-MM-DD` key
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// What kind of goods a donor is offering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationCategory {
    Food,
    Supplies,
    Monetary,
    Other,
}

/// How a published donation reaches the school
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOption {
    Pickup,
    Delivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishedDonationStatus {
    Available,
    Reserved,
    Fulfilled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationRequestStatus {
    Active,
    Fulfilled,
    Cancelled,
}

/// Lifecycle of a class-level request against a published donation
///
/// ```text
/// pending ──approve──▶ approved ──claim──▶ completed
///    │
///    └────reject─────▶ rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyDonationStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl ReadyDonationStatus {
    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(self, next: ReadyDonationStatus) -> bool {
        use ReadyDonationStatus::*;
        match self {
            Pending => matches!(next, Approved | Rejected),
            Approved => matches!(next, Completed),
            Rejected | Completed => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReadyDonationStatus::Rejected | ReadyDonationStatus::Completed)
    }
}

impl fmt::Display for PublishedDonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishedDonationStatus::Available => write!(f, "available"),
            PublishedDonationStatus::Reserved => write!(f, "reserved"),
            PublishedDonationStatus::Fulfilled => write!(f, "fulfilled"),
        }
    }
}

impl fmt::Display for DonationRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DonationRequestStatus::Active => write!(f, "active"),
            DonationRequestStatus::Fulfilled => write!(f, "fulfilled"),
            DonationRequestStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl fmt::Display for ReadyDonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadyDonationStatus::Pending => write!(f, "pending"),
            ReadyDonationStatus::Approved => write!(f, "approved"),
            ReadyDonationStatus::Rejected => write!(f, "rejected"),
            ReadyDonationStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A donor's standing offer of goods or money
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedDonation {
    pub id: String,
    pub donor_id: String,
    pub donor_name: String,
    pub donor_email: String,
    pub item_name: String,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
    pub category: DonationCategory,
    /// How many students the whole offer can feed, if the donor said so
    pub number_of_students: Option<u32>,
    /// Students still uncovered; never exceeds `number_of_students`
    pub remaining_students: Option<u32>,
    pub available_from: String, // YYYY-MM-DD
    pub expiry_date: String,    // YYYY-MM-DD
    pub status: PublishedDonationStatus,
    #[serde(default)]
    pub delivery_options: Vec<DeliveryOption>,
    pub location: String,
    pub created_at: String, // RFC 3339
    pub updated_at: String, // RFC 3339
}

/// A school's ask for a monetary amount toward a purpose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRequest {
    pub id: String,
    pub school_id: String,
    pub school_name: String,
    pub principal_id: String,
    pub principal_name: String,
    pub meal_plan_id: Option<String>,
    pub requested_amount: f64,
    pub purpose: String,
    pub description: String,
    pub target_date: String, // YYYY-MM-DD
    pub status: DonationRequestStatus,
    pub fulfilled_amount: f64,
    pub published_donation_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl DonationRequest {
    /// Amount still needed, zero once the request is covered
    pub fn outstanding_amount(&self) -> f64 {
        (self.requested_amount - self.fulfilled_amount).max(0.0)
    }
}

/// One payment applied to a donation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentRecord {
    pub id: String,
    pub request_id: String,
    pub donor_id: Option<String>,
    pub amount: f64,
    pub note: Option<String>,
    pub recorded_at: String,
}

/// A class-scoped request against a specific published donation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyDonation {
    pub id: String,
    pub published_donation_id: String,
    pub donor_id: String,
    pub school_id: String,
    pub school_name: String,
    pub class_id: String,
    pub principal_id: String,
    pub number_of_students: u32,
    pub status: ReadyDonationStatus,
    pub rejection_reason: Option<String>,
    pub created_at: String,
    pub approved_at: Option<String>,
    pub rejected_at: Option<String>,
    pub completed_at: Option<String>,
    pub claimed_by: Option<String>,
}

/// A class's claimed, consumable meal inventory for one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealStock {
    /// Date-derived natural key, e.g. `2025-03-14` or `2025-03-14_lunch`
    pub id: String,
    pub school_id: String,
    pub class_id: String,
    pub meal_name: String,
    pub quantity: f64,
    pub unit: String,
    /// Number of students this stock can still serve
    pub coverage: u32,
    pub donor_id: String,
    pub donor_name: String,
    pub ready_donation_id: Option<String>,
    pub claimed_by: String,
    pub claimed_at: String,
    pub description: Option<String>,
}

/// A child record owned by the teacher that created it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub student_id: String,
    pub name: String,
    pub date_of_birth: String, // YYYY-MM-DD
    pub age: u32,
    pub grade: String,
    pub class_id: Option<String>,
    #[serde(default)]
    pub school_id: Option<String>,
    pub parent_name: String,
    pub parent_contact: String,
    pub parent_email: String,
    #[serde(default)]
    pub allergies: String,
    #[serde(default)]
    pub meal_feedbacks: String,
    pub parent_access_token: String,
    pub created_at: String,
    #[serde(default)]
    pub meal_served_today: bool,
}

/// Where an access code points: `accessCodes/{code}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCodeIndexEntry {
    pub teacher_id: String,
    pub student_key: String,
}

/// Locally persisted proof of a successful access-code login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentSession {
    pub teacher_id: String,
    pub student_key: String,
    pub student: StudentProfile,
    pub login_time: String, // RFC 3339
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorRating {
    pub id: String,
    pub donor_id: String,
    /// 1 to 5 stars
    pub rating: u8,
    pub comment: Option<String>,
    pub parent_name: Option<String>,
    pub student_key: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonorRatingSummary {
    pub donor_id: String,
    pub average: f64,
    pub count: usize,
}

/// A teacher's record of one meal served to a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealTrackingRecord {
    pub id: String,
    pub teacher_id: String,
    pub school_id: Option<String>,
    pub class_id: Option<String>,
    pub date: String, // YYYY-MM-DD
    pub meal_name: String,
    #[serde(default)]
    pub served_student_keys: Vec<String>,
    pub meal_stock_id: Option<String>,
    pub recorded_at: String,
}

/// Donor attribution shown to parents for today's meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonorInfo {
    pub donor_id: String,
    pub donor_name: String,
    pub meal_name: String,
}

// ---------------------------------------------------------------------------
// Request / response DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePublishedDonationRequest {
    pub donor_id: String,
    pub donor_name: String,
    pub donor_email: String,
    pub item_name: String,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
    pub category: DonationCategory,
    pub number_of_students: Option<u32>,
    pub available_from: String,
    pub expiry_date: String,
    #[serde(default)]
    pub delivery_options: Vec<DeliveryOption>,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePublishedDonationStatusRequest {
    pub status: PublishedDonationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateDonationRequestRequest {
    pub school_id: String,
    pub school_name: String,
    pub principal_id: String,
    pub principal_name: String,
    pub meal_plan_id: Option<String>,
    pub requested_amount: f64,
    pub purpose: String,
    pub description: String,
    pub target_date: String,
    pub published_donation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordFulfillmentRequest {
    pub amount: f64,
    pub donor_id: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentResponse {
    pub donation_request: DonationRequest,
    pub fulfillment: FulfillmentRecord,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateReadyDonationRequest {
    pub published_donation_id: String,
    pub school_id: String,
    pub school_name: String,
    pub class_id: String,
    pub principal_id: String,
    pub number_of_students: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectReadyDonationRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimReadyDonationRequest {
    pub teacher_id: String,
    /// Meal-stock key; today's `YYYY-MM-DD` when omitted
    pub date_id: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimReadyDonationResponse {
    pub ready_donation: ReadyDonation,
    pub meal_stock: MealStock,
    pub remaining_students: Option<u32>,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyDonationListQuery {
    pub donor_id: Option<String>,
    pub class_id: Option<String>,
    pub published_donation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecreaseMealStockRequest {
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateStudentRequest {
    pub student_id: String,
    pub name: String,
    pub date_of_birth: String,
    pub grade: String,
    pub class_id: Option<String>,
    pub school_id: Option<String>,
    pub parent_name: String,
    pub parent_contact: String,
    pub parent_email: String,
    #[serde(default)]
    pub allergies: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStudentRequest {
    pub name: Option<String>,
    pub date_of_birth: Option<String>,
    pub grade: Option<String>,
    pub class_id: Option<String>,
    pub school_id: Option<String>,
    pub parent_name: Option<String>,
    pub parent_contact: Option<String>,
    pub parent_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentResponse {
    pub student_key: String,
    pub student: StudentProfile,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentListResponse {
    pub students: Vec<StudentResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMealServiceRequest {
    pub school_id: Option<String>,
    pub class_id: Option<String>,
    pub meal_name: String,
    #[serde(default)]
    pub served_student_keys: Vec<String>,
    pub meal_stock_id: Option<String>,
    /// Service date; today when omitted
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentLoginRequest {
    pub access_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateAllergiesFeedbackRequest {
    pub allergies: Option<String>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentTodayResponse {
    pub date: String,
    pub meal: Option<MealTrackingRecord>,
    pub donor: Option<DonorInfo>,
    pub meal_served_today: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateDonorRatingRequest {
    pub donor_id: String,
    pub rating: u8,
    pub comment: Option<String>,
}

/// Body of every failed API call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: String,
    pub message: String,
}
