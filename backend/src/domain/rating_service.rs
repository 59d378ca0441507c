use log::info;
use std::sync::Arc;

use shared::{DonorRating, DonorRatingSummary};

use super::errors::{DomainError, DomainResult};
use super::validation::{now_rfc3339, require_max_length, require_non_empty};
use crate::storage::paths;
use crate::storage::repositories::RatingRepository;
use crate::storage::traits::DocumentStore;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
const MAX_COMMENT_LENGTH: usize = 500;

/// Parent ratings of donors. Ratings are append-only.
#[derive(Clone)]
pub struct RatingService {
    repository: RatingRepository,
}

impl RatingService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            repository: RatingRepository::new(store),
        }
    }

    pub async fn add_rating(
        &self,
        donor_id: &str,
        rating: u8,
        comment: Option<String>,
        parent_name: Option<String>,
        student_key: Option<String>,
    ) -> DomainResult<DonorRating> {
        info!("Rating donor {} with {}", donor_id, rating);

        require_non_empty(donor_id, "Donor id")?;
        paths::validate_key(donor_id)
            .map_err(|_| DomainError::validation(format!("Invalid donor id: {:?}", donor_id)))?;
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(DomainError::validation(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
        let comment = comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if let Some(comment) = &comment {
            require_max_length(comment, MAX_COMMENT_LENGTH, "Comment")?;
        }

        let entry = DonorRating {
            id: self.repository.next_id(donor_id).await?,
            donor_id: donor_id.to_string(),
            rating,
            comment,
            parent_name,
            student_key,
            created_at: now_rfc3339(),
        };
        self.repository.store_rating(&entry).await?;
        Ok(entry)
    }

    pub async fn list_ratings(&self, donor_id: &str) -> DomainResult<Vec<DonorRating>> {
        Ok(self.repository.list_for_donor(donor_id).await?)
    }

    /// Average and count; the average is 0 when there are no ratings
    pub async fn rating_summary(&self, donor_id: &str) -> DomainResult<DonorRatingSummary> {
        let ratings = self.repository.list_for_donor(donor_id).await?;
        let count = ratings.len();
        let average = if count == 0 {
            0.0
        } else {
            let total: u32 = ratings.iter().map(|r| u32::from(r.rating)).sum();
            f64::from(total) / count as f64
        };
        Ok(DonorRatingSummary {
            donor_id: donor_id.to_string(),
            average,
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::TestEnvironment;

    #[tokio::test]
    async fn test_add_and_summarize() {
        let env = TestEnvironment::new();
        let service = RatingService::new(env.store.clone());

        let empty = service.rating_summary("donor-1").await.unwrap();
        assert_eq!(empty.count, 0);
        assert_eq!(empty.average, 0.0);

        service
            .add_rating("donor-1", 5, Some("Lovely meal".to_string()), None, None)
            .await
            .unwrap();
        service.add_rating("donor-1", 4, Some("  ".to_string()), None, None).await.unwrap();
        service.add_rating("donor-2", 1, None, None, None).await.unwrap();

        let ratings = service.list_ratings("donor-1").await.unwrap();
        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[0].comment.as_deref(), Some("Lovely meal"));
        assert_eq!(ratings[1].comment, None);

        let summary = service.rating_summary("donor-1").await.unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.average, 4.5);
    }

    #[tokio::test]
    async fn test_rating_bounds() {
        let env = TestEnvironment::new();
        let service = RatingService::new(env.store.clone());

        for rating in [0, 6, 255] {
            assert!(matches!(
                service.add_rating("donor-1", rating, None, None, None).await,
                Err(DomainError::Validation(_))
            ));
        }
        assert!(service.add_rating("", 3, None, None, None).await.is_err());
        assert!(service.list_ratings("donor-1").await.unwrap().is_empty());
    }
}
