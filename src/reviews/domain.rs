use chrono::{DateTime, Utc};
use semval::prelude::*;
use uuid::Uuid;

const MAX_RATING: u8 = 5;
const MIN_RATING: u8 = 1;

/// A stored review with its author joined in.
#[derive(Clone, Debug)]
pub struct Review {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub author: ReviewAuthor,
    pub store_id: Uuid,
    pub text: String,
    pub rating: u8,
}

#[derive(Clone, Debug)]
pub struct ReviewAuthor {
    pub id: Uuid,
    pub email: String,
}

/// A review that has not been persisted yet.
#[derive(Debug)]
pub struct NewReview {
    author_id: Uuid,
    store_id: Uuid,
    text: String,
    rating: u8,
}

impl NewReview {
    pub fn author_id(&self) -> Uuid {
        self.author_id
    }

    pub fn store_id(&self) -> Uuid {
        self.store_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    /// Build a review authored by `author_id` from request data.
    pub fn from_data(author_id: Uuid, data: NewReviewData) -> ValidatedResult<Self> {
        let into = Self {
            author_id,
            store_id: data.store_id,
            text: data.text,
            rating: data.rating,
        };

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NewReviewInvalidity {
    /// The review has no text.
    MissingText,
    /// The rating is outside the allowed range. The bounds are contained as
    /// values.
    RatingOutOfRange(u8, u8),
}

impl Validate for NewReview {
    type Invalidity = NewReviewInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(self.text.trim().is_empty(), NewReviewInvalidity::MissingText)
            .invalidate_if(
                self.rating < MIN_RATING || self.rating > MAX_RATING,
                NewReviewInvalidity::RatingOutOfRange(MIN_RATING, MAX_RATING),
            )
            .into()
    }
}

#[derive(Clone, Debug)]
pub struct NewReviewData {
    pub store_id: Uuid,
    pub text: String,
    pub rating: u8,
}
