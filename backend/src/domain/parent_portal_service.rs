//! What a logged-in parent can see and change.
//!
//! Every operation takes the [`ParentSession`] explicitly; nothing here reads
//! the cached session from local storage.

use chrono::NaiveDate;
use log::{debug, info};
use serde_json::{json, Map};
use std::sync::Arc;

use shared::{
    date_key, DonorInfo, DonorRating, MealTrackingRecord, ParentSession, ParentTodayResponse,
    StudentProfile,
};

use super::commands::parent::StudentFeedbackUpdate;
use super::errors::{DomainError, DomainResult};
use super::meal_tracking_service::MealTrackingService;
use super::rating_service::RatingService;
use super::validation::today;
use super::WriteGate;
use crate::storage::repositories::{MealStockRepository, StudentRepository};
use crate::storage::traits::DocumentStore;

#[derive(Clone)]
pub struct ParentPortalService {
    students: StudentRepository,
    meal_stock: MealStockRepository,
    meal_tracking: MealTrackingService,
    ratings: RatingService,
    write_gate: WriteGate,
}

impl ParentPortalService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        meal_tracking: MealTrackingService,
        ratings: RatingService,
        write_gate: WriteGate,
    ) -> Self {
        Self {
            students: StudentRepository::new(store.clone()),
            meal_stock: MealStockRepository::new(store),
            meal_tracking,
            ratings,
            write_gate,
        }
    }

    /// Current profile of the session's student
    pub async fn get_student(&self, session: &ParentSession) -> DomainResult<StudentProfile> {
        self.students
            .get_student(&session.teacher_id, &session.student_key)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "Student {} no longer exists",
                    session.student_key
                ))
            })
    }

    /// Replace the session's student snapshot with the stored profile
    pub async fn refresh_session(&self, session: &ParentSession) -> DomainResult<ParentSession> {
        let student = self.get_student(session).await?;
        Ok(ParentSession {
            student,
            ..session.clone()
        })
    }

    /// Write only the supplied fields. Supplying neither is a no-op.
    pub async fn update_student_allergies_and_feedback(
        &self,
        teacher_id: &str,
        student_key: &str,
        update: StudentFeedbackUpdate,
    ) -> DomainResult<()> {
        if update.is_empty() {
            debug!("No allergy or feedback changes for {}/{}", teacher_id, student_key);
            return Ok(());
        }

        let _guard = self.write_gate.lock().await;
        if self.students.get_student(teacher_id, student_key).await?.is_none() {
            return Err(DomainError::not_found(format!(
                "Student {} not found for teacher {}",
                student_key, teacher_id
            )));
        }

        let mut fields = Map::new();
        if let Some(allergies) = update.allergies {
            fields.insert("allergies".to_string(), json!(allergies));
        }
        if let Some(feedback) = update.feedback {
            fields.insert("mealFeedbacks".to_string(), json!(feedback));
        }
        self.students
            .update_fields(teacher_id, student_key, fields)
            .await?;

        info!("Parent updated allergies/feedback for {}/{}", teacher_id, student_key);
        Ok(())
    }

    pub async fn meal_for_date(
        &self,
        session: &ParentSession,
        date: NaiveDate,
    ) -> DomainResult<Option<MealTrackingRecord>> {
        self.meal_tracking
            .meal_for_date(&session.teacher_id, session.student.class_id.as_deref(), date)
            .await
    }

    pub async fn todays_meal(&self, session: &ParentSession) -> DomainResult<Option<MealTrackingRecord>> {
        self.meal_for_date(session, today()).await
    }

    /// Donor of the student's class stock dated `date`, if any
    pub async fn donor_for_date(
        &self,
        session: &ParentSession,
        date: NaiveDate,
    ) -> DomainResult<Option<DonorInfo>> {
        let (Some(school_id), Some(class_id)) = (
            session.student.school_id.as_deref(),
            session.student.class_id.as_deref(),
        ) else {
            debug!("Student {} has no school/class; no donor to show", session.student_key);
            return Ok(None);
        };

        let key = date_key(date);
        let stock = self.meal_stock.list_for_class(school_id, class_id).await?;
        Ok(stock
            .into_iter()
            .find(|s| s.id.starts_with(&key))
            .map(|s| DonorInfo {
                donor_id: s.donor_id,
                donor_name: s.donor_name,
                meal_name: s.meal_name,
            }))
    }

    pub async fn todays_donor(&self, session: &ParentSession) -> DomainResult<Option<DonorInfo>> {
        self.donor_for_date(session, today()).await
    }

    /// Meal, donor and served flag for one day
    pub async fn day_overview(
        &self,
        session: &ParentSession,
        date: NaiveDate,
    ) -> DomainResult<ParentTodayResponse> {
        let student = self.get_student(session).await?;
        Ok(ParentTodayResponse {
            date: date_key(date),
            meal: self.meal_for_date(session, date).await?,
            donor: self.donor_for_date(session, date).await?,
            meal_served_today: student.meal_served_today,
        })
    }

    /// Rate a donor on behalf of the session's parent
    pub async fn rate_donor(
        &self,
        session: &ParentSession,
        donor_id: &str,
        rating: u8,
        comment: Option<String>,
    ) -> DomainResult<DonorRating> {
        debug!("Parent of {} rating donor {}", session.student_key, donor_id);
        self.ratings
            .add_rating(
                donor_id,
                rating,
                comment,
                Some(session.student.parent_name.clone()),
                Some(session.student_key.clone()),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::commands::meal_service::RecordMealServiceCommand;
    use crate::domain::{ParentAuthService, StudentService};
    use crate::storage::test_utils::{sample_student, SlowCommitStore, TestEnvironment};
    use std::time::Duration;
    use shared::MealStock;

    struct Fixture {
        env: TestEnvironment,
        portal: ParentPortalService,
        tracking: MealTrackingService,
        session: ParentSession,
    }

    async fn setup_test() -> Fixture {
        let env = TestEnvironment::new();
        let students = StudentService::new(env.store.clone(), env.write_gate.clone());
        let tracking = MealTrackingService::new(env.store.clone(), env.write_gate.clone());
        let portal = ParentPortalService::new(
            env.store.clone(),
            tracking.clone(),
            RatingService::new(env.store.clone()),
            env.write_gate.clone(),
        );

        let mut request = sample_student("Ada");
        request.allergies = "peanuts".to_string();
        let record = students.create_student("teacher-1", request).await.unwrap();
        let session = ParentAuthService::new(env.store.clone(), env.local_storage.clone())
            .login_with_access_code(&record.student.parent_access_token)
            .await
            .unwrap();

        Fixture {
            env,
            portal,
            tracking,
            session,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_field() {
        let fixture = setup_test().await;
        let portal = &fixture.portal;
        let session = &fixture.session;

        portal
            .update_student_allergies_and_feedback(
                &session.teacher_id,
                &session.student_key,
                StudentFeedbackUpdate {
                    allergies: None,
                    feedback: Some("Loved the soup".to_string()),
                },
            )
            .await
            .unwrap();

        let student = portal.get_student(session).await.unwrap();
        assert_eq!(student.allergies, "peanuts");
        assert_eq!(student.meal_feedbacks, "Loved the soup");

        portal
            .update_student_allergies_and_feedback(
                &session.teacher_id,
                &session.student_key,
                StudentFeedbackUpdate {
                    allergies: Some("peanuts, dairy".to_string()),
                    feedback: None,
                },
            )
            .await
            .unwrap();

        let refreshed = portal.refresh_session(session).await.unwrap();
        assert_eq!(refreshed.student.allergies, "peanuts, dairy");
        assert_eq!(refreshed.student.meal_feedbacks, "Loved the soup");
        assert_eq!(refreshed.login_time, session.login_time);
    }

    #[tokio::test]
    async fn test_empty_update_is_noop() {
        let fixture = setup_test().await;

        fixture
            .portal
            .update_student_allergies_and_feedback("teacher-1", "ghost", StudentFeedbackUpdate::default())
            .await
            .unwrap();
        assert!(matches!(
            fixture
                .portal
                .update_student_allergies_and_feedback(
                    "teacher-1",
                    "ghost",
                    StudentFeedbackUpdate {
                        allergies: Some("none".to_string()),
                        feedback: None,
                    },
                )
                .await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_during_student_delete_does_not_recreate_student() {
        let env = TestEnvironment::new();
        let store: Arc<dyn DocumentStore> = Arc::new(SlowCommitStore::new(
            env.json_store.clone(),
            Duration::from_millis(100),
        ));
        let students = StudentService::new(store.clone(), env.write_gate.clone());
        let portal = ParentPortalService::new(
            store.clone(),
            MealTrackingService::new(store.clone(), env.write_gate.clone()),
            RatingService::new(store),
            env.write_gate.clone(),
        );
        let record = students.create_student("teacher-1", sample_student("Ada")).await.unwrap();

        let deleting = {
            let students = students.clone();
            let key = record.student_key.clone();
            tokio::spawn(async move { students.delete_student("teacher-1", &key).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let result = portal
            .update_student_allergies_and_feedback(
                "teacher-1",
                &record.student_key,
                StudentFeedbackUpdate {
                    allergies: Some("none".to_string()),
                    feedback: None,
                },
            )
            .await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
        deleting.await.unwrap().unwrap();

        let path = format!("students/teacher-1/{}", record.student_key);
        assert!(env.store.get(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_day_overview() {
        let fixture = setup_test().await;
        let session = &fixture.session;

        let empty = fixture.portal.day_overview(session, day()).await.unwrap();
        assert!(empty.meal.is_none());
        assert!(empty.donor.is_none());
        assert!(!empty.meal_served_today);

        MealStockRepository::new(fixture.env.store.clone())
            .store_stock(&MealStock {
                id: "2025-03-14".to_string(),
                school_id: "school-1".to_string(),
                class_id: "class-4a".to_string(),
                meal_name: "Vegetable rice".to_string(),
                quantity: 30.0,
                unit: "portions".to_string(),
                coverage: 30,
                donor_id: "donor-1".to_string(),
                donor_name: "Green Grocer".to_string(),
                ready_donation_id: None,
                claimed_by: "teacher-1".to_string(),
                claimed_at: "2025-03-14T07:00:00+00:00".to_string(),
                description: None,
            })
            .await
            .unwrap();
        fixture
            .tracking
            .record_meal_service(RecordMealServiceCommand {
                teacher_id: "teacher-1".to_string(),
                school_id: Some("school-1".to_string()),
                class_id: Some("class-4a".to_string()),
                meal_name: "Vegetable rice".to_string(),
                served_student_keys: vec![session.student_key.clone()],
                meal_stock_id: Some("2025-03-14".to_string()),
                date: day(),
            })
            .await
            .unwrap();

        let overview = fixture.portal.day_overview(session, day()).await.unwrap();
        assert_eq!(overview.date, "2025-03-14");
        assert_eq!(overview.meal.unwrap().meal_name, "Vegetable rice");
        let donor = overview.donor.unwrap();
        assert_eq!(donor.donor_id, "donor-1");
        assert_eq!(donor.donor_name, "Green Grocer");
        assert!(overview.meal_served_today);

        let next_day = day().succ_opt().unwrap();
        assert!(fixture.portal.donor_for_date(session, next_day).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rate_donor_attributes_parent() {
        let fixture = setup_test().await;

        let rating = fixture
            .portal
            .rate_donor(&fixture.session, "donor-1", 5, Some("Thank you".to_string()))
            .await
            .unwrap();

        assert_eq!(rating.parent_name.as_deref(), Some("Parent of Ada"));
        assert_eq!(rating.student_key.as_deref(), Some(fixture.session.student_key.as_str()));
    }
}
