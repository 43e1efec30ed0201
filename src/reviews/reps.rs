use chrono::{DateTime, Utc};
use semval::context::Context as ValidationContext;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::{self, NewReviewData, NewReviewInvalidity};

#[derive(Deserialize)]
pub struct NewReviewRequest {
    pub store_id: Uuid,
    pub text: String,
    pub rating: u8,
}

impl From<NewReviewRequest> for NewReviewData {
    fn from(rep: NewReviewRequest) -> Self {
        Self {
            store_id: rep.store_id,
            text: rep.text,
            rating: rep.rating,
        }
    }
}

#[derive(Serialize)]
pub struct ReviewAuthor {
    pub id: Uuid,
    pub email: String,
}

#[derive(Serialize)]
pub struct Review {
    pub id: Uuid,
    pub created: DateTime<Utc>,
    pub author: ReviewAuthor,
    pub store_id: Uuid,
    pub text: String,
    pub rating: u8,
}

impl From<&domain::Review> for Review {
    fn from(review: &domain::Review) -> Self {
        Self {
            id: review.id,
            created: review.created_at,
            author: ReviewAuthor {
                id: review.author.id,
                email: review.author.email.clone(),
            },
            store_id: review.store_id,
            text: review.text.clone(),
            rating: review.rating,
        }
    }
}

#[derive(Default, Serialize)]
pub struct NewReviewValidationError {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub text: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rating: Vec<String>,
}

impl From<ValidationContext<NewReviewInvalidity>> for NewReviewValidationError {
    fn from(context: ValidationContext<NewReviewInvalidity>) -> Self {
        let mut response = Self::default();

        for invalidity in context.into_iter() {
            match invalidity {
                NewReviewInvalidity::MissingText => {
                    response.text.push("A review must have text.".to_owned());
                }
                NewReviewInvalidity::RatingOutOfRange(min, max) => {
                    response
                        .rating
                        .push(format!("Rating must be between {} and {}.", min, max));
                }
            }
        }

        response
    }
}
