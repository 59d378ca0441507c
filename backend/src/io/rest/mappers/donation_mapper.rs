//! Mapping between donation DTOs and domain commands/outcomes.

use shared::{
    ClaimReadyDonationRequest, ClaimReadyDonationResponse, FulfillmentResponse,
    ReadyDonationListQuery, RecordFulfillmentRequest,
};

use crate::domain::commands::fulfillment::{FulfillmentOutcome, RecordFulfillmentCommand};
use crate::domain::commands::lifecycle::ClaimTarget;
use crate::domain::{ClaimOutcome, ReadyDonationFilter};

pub struct DonationMapper;

impl DonationMapper {
    pub fn to_fulfillment_command(
        request_id: String,
        request: RecordFulfillmentRequest,
    ) -> RecordFulfillmentCommand {
        RecordFulfillmentCommand {
            request_id,
            amount: request.amount,
            donor_id: request.donor_id,
            note: request.note,
        }
    }

    pub fn to_fulfillment_response(outcome: FulfillmentOutcome) -> FulfillmentResponse {
        let success_message = format!(
            "Recorded {:.2}; {:.2} of {:.2} fulfilled",
            outcome.record.amount,
            outcome.request.fulfilled_amount,
            outcome.request.requested_amount
        );
        FulfillmentResponse {
            donation_request: outcome.request,
            fulfillment: outcome.record,
            success_message,
        }
    }

    pub fn to_claim_target(request: ClaimReadyDonationRequest) -> ClaimTarget {
        ClaimTarget {
            teacher_id: request.teacher_id,
            date_id: request.date_id,
            description: request.description,
        }
    }

    pub fn to_claim_response(outcome: ClaimOutcome) -> ClaimReadyDonationResponse {
        let success_message = format!(
            "{} added to meal stock {} for {} students",
            outcome.meal_stock.meal_name, outcome.meal_stock.id, outcome.ready_donation.number_of_students
        );
        ClaimReadyDonationResponse {
            remaining_students: outcome.published_donation.remaining_students,
            ready_donation: outcome.ready_donation,
            meal_stock: outcome.meal_stock,
            success_message,
        }
    }

    pub fn to_filter(query: ReadyDonationListQuery) -> ReadyDonationFilter {
        ReadyDonationFilter {
            donor_id: query.donor_id,
            class_id: query.class_id,
            published_donation_id: query.published_donation_id,
        }
    }
}
