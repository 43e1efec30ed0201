use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    database::PostgresConnection,
    reviews::domain::{NewReview, Review, ReviewAuthor},
};

pub type DynReviewRepo = Arc<dyn ReviewRepo + Send + Sync>;

#[async_trait]
pub trait ReviewRepo {
    async fn insert_review(&self, review: &NewReview) -> Result<Review>;

    /// List reviews, newest first, with each review's author joined in.
    ///
    /// The join is part of this query's name and contract. Queries on this
    /// repository never expand related records implicitly.
    async fn list_reviews_with_author(&self) -> Result<Vec<Review>>;
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    author_id: Uuid,
    author_email: String,
    store_id: Uuid,
    text: String,
    rating: i16,
}

impl ReviewRow {
    fn into_review(self) -> Result<Review> {
        Ok(Review {
            id: self.id,
            created_at: self.created_at,
            author: ReviewAuthor {
                id: self.author_id,
                email: self.author_email,
            },
            store_id: self.store_id,
            text: self.text,
            rating: self
                .rating
                .try_into()
                .context("stored rating is out of range")?,
        })
    }
}

#[async_trait]
impl ReviewRepo for PostgresConnection {
    async fn insert_review(&self, review: &NewReview) -> Result<Review> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r#"
            WITH inserted AS (
                INSERT INTO review (id, author_id, store_id, text, rating)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, created_at, author_id, store_id, text, rating
            )
            SELECT i.id, i.created_at, i.author_id, a.email AS author_email,
                   i.store_id, i.text, i.rating
            FROM inserted i
            JOIN account a ON a.id = i.author_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(review.author_id())
        .bind(review.store_id())
        .bind(review.text())
        .bind(i16::from(review.rating()))
        .fetch_one(&**self)
        .await?;

        row.into_review()
    }

    async fn list_reviews_with_author(&self) -> Result<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT r.id, r.created_at, r.author_id, a.email AS author_email,
                   r.store_id, r.text, r.rating
            FROM review r
            JOIN account a ON a.id = r.author_id
            ORDER BY r.created_at DESC
            "#,
        )
        .fetch_all(&**self)
        .await?;

        rows.into_iter().map(ReviewRow::into_review).collect()
    }
}
