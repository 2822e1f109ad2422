// libs/records-cell/src/services/reviews.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use shared_database::{DocumentStore, MigrationReport};

use crate::models::{
    CreateReviewRequest, RecordError, Review, ReviewQuery, ReviewSummary, UpdateReviewRequest,
};
use crate::services::collection::RecordCollection;

pub const REVIEWS_KEY: &str = "reviews";

fn validate_rating(rating: u8) -> Result<(), RecordError> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(RecordError::Validation(format!(
            "rating must be between 1 and 5, got {}",
            rating
        )))
    }
}

pub fn summarize(doctor_id: Option<&str>, reviews: &[Review]) -> ReviewSummary {
    let mut histogram: BTreeMap<u8, usize> = (1..=5).map(|star| (star, 0)).collect();
    for review in reviews {
        *histogram.entry(review.rating).or_default() += 1;
    }

    let count = reviews.len();
    let average_rating = if count == 0 {
        0.0
    } else {
        let total: u32 = reviews.iter().map(|r| r.rating as u32).sum();
        (total as f64 / count as f64 * 10.0).round() / 10.0
    };

    ReviewSummary {
        doctor_id: doctor_id.map(str::to_string),
        count,
        average_rating,
        histogram,
    }
}

#[derive(Clone)]
pub struct ReviewService {
    records: RecordCollection<Review>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Result<Self, RecordError> {
        Ok(Self {
            records: RecordCollection::new(store, REVIEWS_KEY)?,
        })
    }

    pub async fn migrate(&self) -> Result<MigrationReport, RecordError> {
        self.records.migrate().await
    }

    pub async fn list(&self, query: &ReviewQuery) -> Result<Vec<Review>, RecordError> {
        self.records
            .filter(|review| query.doctor_id.as_deref().is_none_or(|id| review.doctor_id == id))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Review, RecordError> {
        self.records.get(id).await
    }

    pub async fn summary(&self, doctor_id: Option<&str>) -> Result<ReviewSummary, RecordError> {
        let reviews = self
            .list(&ReviewQuery {
                doctor_id: doctor_id.map(str::to_string),
            })
            .await?;
        Ok(summarize(doctor_id, &reviews))
    }

    pub async fn create(
        &self,
        patient_id: String,
        request: CreateReviewRequest,
    ) -> Result<Review, RecordError> {
        validate_rating(request.rating)?;
        if request.doctor_id.trim().is_empty() {
            return Err(RecordError::Validation("doctor_id is required".to_string()));
        }

        let now = Utc::now();
        let review = self
            .records
            .insert(Review {
                id: format!("rev-{}", Uuid::new_v4().simple()),
                doctor_id: request.doctor_id,
                patient_id,
                patient_name: request.patient_name.trim().to_string(),
                rating: request.rating,
                comment: request.comment,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!("Review {} left for doctor {}", review.id, review.doctor_id);
        Ok(review)
    }

    pub async fn update(&self, id: &str, request: UpdateReviewRequest) -> Result<Review, RecordError> {
        self.records
            .update(id, |review| {
                if let Some(rating) = request.rating {
                    validate_rating(rating)?;
                    review.rating = rating;
                }
                if request.comment.is_some() {
                    review.comment = request.comment;
                }
                review.updated_at = Utc::now();
                Ok(())
            })
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), RecordError> {
        self.records.remove(id).await.map(|_| ())
    }
}
