use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use axum_extra::extract::{cookie::Key, PrivateCookieJar};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// Name of the private cookie holding the serialized session.
pub const SESSION_COOKIE: &str = "session";

/// An authenticated session tied to a user.
#[derive(Debug, Deserialize, Serialize)]
pub struct Session {
    id: Uuid,
    user_id: Uuid,
}

impl Session {
    /// Create a new session for a specific user.
    pub fn new_for_user(user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
        }
    }

    pub fn serialized(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = PrivateCookieJar::<Key>::from_request_parts(parts, state)
            .await
            .map_err(|_| StatusCode::UNAUTHORIZED)?;

        let session_cookie = cookies
            .get(SESSION_COOKIE)
            .ok_or(StatusCode::UNAUTHORIZED)?;

        match serde_json::from_str::<Session>(session_cookie.value()) {
            Ok(session) => {
                debug!(
                    user_id = %session.user_id(),
                    session_id = %session.id(),
                    "Parsed cookie session."
                );

                Ok(session)
            }
            Err(error) => {
                warn!(?error, "Received malformed session value.");

                Err(StatusCode::UNAUTHORIZED)
            }
        }
    }
}
