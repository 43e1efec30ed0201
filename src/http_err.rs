use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::rate_limit::RateLimitError;

#[derive(Serialize)]
pub struct ErrorRep {
    pub message: String,
}

pub enum ApiError {
    InternalServerError,
    TooManyRequests,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorRep {
                    message: "Internal server error.".to_owned(),
                }),
            )
                .into_response(),
            Self::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorRep {
                    message: "Too many attempts. Please try again later.".to_owned(),
                }),
            )
                .into_response(),
        }
    }
}

impl From<RateLimitError> for ApiError {
    fn from(error: RateLimitError) -> Self {
        match error {
            RateLimitError::LimitedUntil(_) => Self::TooManyRequests,
            RateLimitError::Other(error) => {
                error!(?error, "Failed to query rate limiter.");

                Self::InternalServerError
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        error!(?error, "Received error.");

        Self::InternalServerError
    }
}

pub type ApiResponse<T> = Result<T, ApiError>;
