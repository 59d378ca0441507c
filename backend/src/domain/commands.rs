//! Domain-level command types.
//!
//! These structs are used by services inside the domain layer and are **not**
//! exposed over the public API. The REST layer maps the public DTOs defined in
//! the `shared` crate to these internal types.

pub mod lifecycle {
    /// Where a teacher claims an approved ready donation into meal stock.
    #[derive(Debug, Clone)]
    pub struct ClaimTarget {
        pub teacher_id: String,
        /// Meal-stock key; today's `YYYY-MM-DD` when `None`
        pub date_id: Option<String>,
        pub description: Option<String>,
    }
}

pub mod fulfillment {
    use shared::{DonationRequest, FulfillmentRecord};

    /// A payment applied to a money request.
    #[derive(Debug, Clone)]
    pub struct RecordFulfillmentCommand {
        pub request_id: String,
        pub amount: f64,
        pub donor_id: Option<String>,
        pub note: Option<String>,
    }

    /// Result of recording a payment.
    #[derive(Debug, Clone)]
    pub struct FulfillmentOutcome {
        pub request: DonationRequest,
        pub record: FulfillmentRecord,
    }
}

pub mod parent {
    /// Parent-editable student fields. `None` leaves the stored value untouched.
    #[derive(Debug, Clone, Default)]
    pub struct StudentFeedbackUpdate {
        pub allergies: Option<String>,
        pub feedback: Option<String>,
    }

    impl StudentFeedbackUpdate {
        pub fn is_empty(&self) -> bool {
            self.allergies.is_none() && self.feedback.is_none()
        }
    }
}

pub mod meal_service {
    use chrono::NaiveDate;

    /// A teacher serving a meal to some of their students.
    #[derive(Debug, Clone)]
    pub struct RecordMealServiceCommand {
        pub teacher_id: String,
        pub school_id: Option<String>,
        pub class_id: Option<String>,
        pub meal_name: String,
        pub served_student_keys: Vec<String>,
        /// Meal stock to draw coverage from, in the given school/class
        pub meal_stock_id: Option<String>,
        pub date: NaiveDate,
    }
}
