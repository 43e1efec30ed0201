use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::{cookie::Cookie, PrivateCookieJar};
use cookie::time::Duration;
use semval::ValidatedFrom;
use tracing::error;

use crate::{
    authentication::{Session, SESSION_COOKIE},
    client_ip::ClientIp,
    http_err::{ApiError, ApiResponse, ErrorRep},
    passwords::Password,
    rate_limit::DynRateLimiter,
    server::AppState,
};

use super::{
    domain::resets::ResetRequest,
    service::{ConsumeResetError, PasswordResetService},
};

pub mod reps;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/password-reset-requests",
            post(create_password_reset_request),
        )
        .route(
            "/reset/:token",
            get(get_password_reset).post(complete_password_reset),
        )
}

pub enum CreatePasswordResetResponse {
    Accepted(reps::PasswordResetRequested),
    BadRequest(reps::PasswordResetValidationError),
}

impl IntoResponse for CreatePasswordResetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Accepted(body) => (StatusCode::OK, Json(body)).into_response(),
            Self::BadRequest(body) => (StatusCode::BAD_REQUEST, Json(body)).into_response(),
        }
    }
}

async fn create_password_reset_request(
    ClientIp(client_ip): ClientIp,
    State(rate_limiter): State<DynRateLimiter>,
    State(reset_service): State<PasswordResetService>,
    Json(reset_request): Json<reps::PasswordResetRequest>,
) -> ApiResponse<CreatePasswordResetResponse> {
    let rate_limit_key = format!("/account/password-reset-requests_post_{}", client_ip);
    rate_limiter.record_operation(&rate_limit_key, 10)?;

    let request = match ResetRequest::validated_from(reset_request.email.as_str()) {
        Ok(request) => request,
        Err((_, context)) => {
            return Ok(CreatePasswordResetResponse::BadRequest(context.into()));
        }
    };

    // Unknown addresses take this same path. The response body is identical
    // either way, so it never reveals whether an email is registered.
    match reset_service.issue_reset(request).await {
        Ok(_) => Ok(CreatePasswordResetResponse::Accepted(Default::default())),
        Err(error) => {
            error!(?error, "Failed to issue password reset.");

            Err(ApiError::InternalServerError)
        }
    }
}

pub enum GetPasswordResetResponse {
    Valid,
    InvalidOrExpired,
}

impl IntoResponse for GetPasswordResetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Valid => (
                StatusCode::OK,
                Json(reps::PasswordResetRequested {
                    message: "Reset token is valid.".to_owned(),
                }),
            )
                .into_response(),
            Self::InvalidOrExpired => (
                StatusCode::NOT_FOUND,
                Json(ErrorRep {
                    message: "Password reset is invalid or has expired.".to_owned(),
                }),
            )
                .into_response(),
        }
    }
}

async fn get_password_reset(
    State(reset_service): State<PasswordResetService>,
    Path(token): Path<String>,
) -> ApiResponse<GetPasswordResetResponse> {
    match reset_service.validate_reset_token(&token).await {
        Ok(Some(_)) => Ok(GetPasswordResetResponse::Valid),
        Ok(None) => Ok(GetPasswordResetResponse::InvalidOrExpired),
        Err(error) => {
            error!(?error, "Failed to validate reset token.");

            Err(ApiError::InternalServerError)
        }
    }
}

pub enum CompletePasswordResetResponse {
    Completed(PrivateCookieJar),
    ConfirmationMismatch,
    InvalidPassword(reps::NewPasswordValidationError),
    InvalidOrExpired,
}

impl IntoResponse for CompletePasswordResetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Completed(cookie_jar) => {
                (cookie_jar, Json(reps::PasswordResetComplete::default())).into_response()
            }
            Self::ConfirmationMismatch => (
                StatusCode::BAD_REQUEST,
                Json(ErrorRep {
                    message: "Passwords do not match.".to_owned(),
                }),
            )
                .into_response(),
            Self::InvalidPassword(body) => (StatusCode::BAD_REQUEST, Json(body)).into_response(),
            Self::InvalidOrExpired => (
                StatusCode::NOT_FOUND,
                Json(ErrorRep {
                    message: "Password reset is invalid or has expired.".to_owned(),
                }),
            )
                .into_response(),
        }
    }
}

async fn complete_password_reset(
    State(reset_service): State<PasswordResetService>,
    cookies: PrivateCookieJar,
    Path(token): Path<String>,
    Json(body): Json<reps::CompletePasswordReset>,
) -> ApiResponse<CompletePasswordResetResponse> {
    // The confirmation gate runs before the token manager is invoked at all.
    if !body.confirmation_matches() {
        return Ok(CompletePasswordResetResponse::ConfirmationMismatch);
    }

    let password = match Password::validated_from(body.password.as_str()) {
        Ok(password) => password,
        Err((_, context)) => {
            return Ok(CompletePasswordResetResponse::InvalidPassword(
                context.into(),
            ));
        }
    };

    match reset_service.consume_reset(&token, password).await {
        Ok(account) => {
            let session = Session::new_for_user(account.id);
            let serialized_session = session.serialized()?;
            let session_cookie = Cookie::build(SESSION_COOKIE, serialized_session)
                .path("/")
                .max_age(Duration::days(7))
                .finish();

            Ok(CompletePasswordResetResponse::Completed(
                cookies.add(session_cookie),
            ))
        }
        Err(ConsumeResetError::InvalidOrExpiredToken) => {
            Ok(CompletePasswordResetResponse::InvalidOrExpired)
        }
        Err(error) => {
            error!(?error, "Failed to consume reset token.");

            Err(ApiError::InternalServerError)
        }
    }
}
