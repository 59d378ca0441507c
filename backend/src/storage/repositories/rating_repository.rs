use anyhow::Result;
use shared::DonorRating;
use std::sync::Arc;

use super::{decode_children, encode};
use crate::storage::paths;
use crate::storage::traits::DocumentStore;

/// Append-only donor ratings, `donorRatings/{donorId}/{ratingId}`
#[derive(Clone)]
pub struct RatingRepository {
    store: Arc<dyn DocumentStore>,
}

impl RatingRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn next_id(&self, donor_id: &str) -> Result<String> {
        paths::validate_key(donor_id)?;
        self.store.push(&paths::donor_ratings(donor_id)).await
    }

    pub async fn store_rating(&self, rating: &DonorRating) -> Result<()> {
        paths::validate_key(&rating.id)?;
        let path = format!("{}/{}", paths::donor_ratings(&rating.donor_id), rating.id);
        self.store.set(&path, encode(rating)?).await
    }

    /// Ratings for a donor, oldest first
    pub async fn list_for_donor(&self, donor_id: &str) -> Result<Vec<DonorRating>> {
        if paths::validate_key(donor_id).is_err() {
            return Ok(Vec::new());
        }
        let value = self.store.get(&paths::donor_ratings(donor_id)).await?;
        let mut ratings: Vec<DonorRating> = decode_children(value)
            .into_iter()
            .map(|(_, rating)| rating)
            .collect();
        ratings.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(ratings)
    }
}
