use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::error;

use crate::{
    authentication::Session,
    http_err::{ApiError, ApiResponse},
    repos::DynReviewRepo,
    server::AppState,
};

use super::{
    domain::NewReview,
    reps,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(get_reviews).post(create_review))
}

async fn get_reviews(
    State(review_repo): State<DynReviewRepo>,
) -> ApiResponse<Json<Vec<reps::Review>>> {
    match review_repo.list_reviews_with_author().await {
        Ok(reviews) => Ok(Json(reviews.iter().map(reps::Review::from).collect())),
        Err(error) => {
            error!(?error, "Failed to list reviews.");

            Err(ApiError::InternalServerError)
        }
    }
}

pub enum CreateReviewResponse {
    Created(reps::Review),
    BadRequest(reps::NewReviewValidationError),
}

impl IntoResponse for CreateReviewResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(review) => (StatusCode::CREATED, Json(review)).into_response(),
            Self::BadRequest(body) => (StatusCode::BAD_REQUEST, Json(body)).into_response(),
        }
    }
}

async fn create_review(
    session: Session,
    State(review_repo): State<DynReviewRepo>,
    Json(new_review): Json<reps::NewReviewRequest>,
) -> ApiResponse<CreateReviewResponse> {
    let review = match NewReview::from_data(session.user_id(), new_review.into()) {
        Ok(review) => review,
        Err((_, context)) => {
            return Ok(CreateReviewResponse::BadRequest(context.into()));
        }
    };

    match review_repo.insert_review(&review).await {
        Ok(saved) => Ok(CreateReviewResponse::Created(reps::Review::from(&saved))),
        Err(error) => {
            error!(?error, "Failed to persist review.");

            Err(ApiError::InternalServerError)
        }
    }
}
