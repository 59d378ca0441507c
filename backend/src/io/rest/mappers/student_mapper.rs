//! Mapping between student/parent DTOs and domain types.

use shared::{
    RecordMealServiceRequest, StudentListResponse, StudentResponse, UpdateAllergiesFeedbackRequest,
};

use crate::domain::commands::meal_service::RecordMealServiceCommand;
use crate::domain::commands::parent::StudentFeedbackUpdate;
use crate::domain::validation::{parse_date, today};
use crate::domain::DomainResult;
use crate::storage::StudentRecord;

pub struct StudentMapper;

impl StudentMapper {
    pub fn to_response(record: StudentRecord, success_message: impl Into<String>) -> StudentResponse {
        StudentResponse {
            student_key: record.student_key,
            student: record.student,
            success_message: success_message.into(),
        }
    }

    pub fn to_list_response(records: Vec<StudentRecord>) -> StudentListResponse {
        StudentListResponse {
            students: records
                .into_iter()
                .map(|record| Self::to_response(record, ""))
                .collect(),
        }
    }

    /// Build a meal service command; the date defaults to today
    pub fn to_meal_service_command(
        teacher_id: String,
        request: RecordMealServiceRequest,
    ) -> DomainResult<RecordMealServiceCommand> {
        let date = match request.date.as_deref() {
            Some(date) => parse_date(date, "Date")?,
            None => today(),
        };
        Ok(RecordMealServiceCommand {
            teacher_id,
            school_id: request.school_id,
            class_id: request.class_id,
            meal_name: request.meal_name,
            served_student_keys: request.served_student_keys,
            meal_stock_id: request.meal_stock_id,
            date,
        })
    }

    pub fn to_feedback_update(request: UpdateAllergiesFeedbackRequest) -> StudentFeedbackUpdate {
        StudentFeedbackUpdate {
            allergies: request.allergies,
            feedback: request.feedback,
        }
    }
}
