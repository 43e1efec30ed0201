use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::{cookie::Cookie, PrivateCookieJar};
use cookie::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::{
    client_ip::ClientIp,
    http_err::{ApiError, ApiResponse},
    rate_limit::DynRateLimiter,
    server::AppState,
};

use super::{session::SESSION_COOKIE, DynCredentialVerifier, Session};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/cookie-sessions",
            post(create_cookie_session).delete(delete_cookie_session),
        )
        .route("/me", get(get_user_info))
}

#[derive(Deserialize)]
struct EmailPasswordPair {
    email: String,
    password: String,
}

#[derive(Serialize)]
pub struct SessionCreationError {
    message: String,
}

pub enum CreateSessionResponse {
    Created(PrivateCookieJar),
    BadRequest(SessionCreationError),
}

impl IntoResponse for CreateSessionResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(cookie_jar) => (cookie_jar, StatusCode::CREATED).into_response(),
            Self::BadRequest(error) => (StatusCode::BAD_REQUEST, Json(error)).into_response(),
        }
    }
}

async fn create_cookie_session(
    ClientIp(client_ip): ClientIp,
    State(rate_limiter): State<DynRateLimiter>,
    State(credential_verifier): State<DynCredentialVerifier>,
    cookies: PrivateCookieJar,
    Json(credentials): Json<EmailPasswordPair>,
) -> ApiResponse<CreateSessionResponse> {
    let rate_limit_key = format!("/authentication/cookie-sessions_post_{}", client_ip);
    rate_limiter.record_operation(&rate_limit_key, 10)?;

    let verified = credential_verifier
        .verify(&credentials.email, &credentials.password)
        .await;

    match verified {
        Ok(Some(account)) => {
            let session = Session::new_for_user(account.id);
            let serialized_session = session.serialized()?;
            let session_cookie = Cookie::build(SESSION_COOKIE, serialized_session)
                .path("/")
                .max_age(Duration::days(7))
                .finish();

            Ok(CreateSessionResponse::Created(cookies.add(session_cookie)))
        }
        Ok(None) => Ok(CreateSessionResponse::BadRequest(SessionCreationError {
            message: "Invalid email or password.".to_owned(),
        })),
        Err(error) => {
            error!(?error, "Failed to verify credentials.");

            Err(ApiError::InternalServerError)
        }
    }
}

#[derive(Serialize)]
pub struct SessionDeleted {
    message: String,
}

async fn delete_cookie_session(cookies: PrivateCookieJar) -> impl IntoResponse {
    let updated_cookies = cookies.remove(Cookie::named(SESSION_COOKIE));

    (
        updated_cookies,
        Json(SessionDeleted {
            message: "You have successfully logged out.".to_owned(),
        }),
    )
}

#[derive(Serialize)]
pub struct UserInfo {
    pub user_id: Uuid,
}

async fn get_user_info(session: Session) -> Json<UserInfo> {
    Json(UserInfo {
        user_id: session.user_id(),
    })
}
