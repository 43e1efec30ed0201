use chrono::{DateTime, Duration, Utc};
use rand::{thread_rng, RngCore};
use semval::prelude::*;

use super::email::{Email, EmailInvalidity};

/// Number of random bytes in a reset token. 32 bytes gives 256 bits of
/// entropy, so tokens never need a uniqueness check against the store.
const RESET_TOKEN_BYTES: usize = 32;

/// Length of a hex-encoded reset token.
pub const RESET_TOKEN_LENGTH: usize = RESET_TOKEN_BYTES * 2;

/// How long a reset token stays valid after issuance.
pub const RESET_TOKEN_TTL_SECONDS: i64 = 3600;

/// A request to start the password-reset flow for an email address.
#[derive(Debug)]
pub struct ResetRequest {
    email: Email,
}

impl ResetRequest {
    pub fn email(&self) -> &Email {
        &self.email
    }
}

impl Validate for ResetRequest {
    type Invalidity = EmailInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new().validate(&self.email).into()
    }
}

impl ValidatedFrom<&str> for ResetRequest {
    fn validated_from(from: &str) -> ValidatedResult<Self> {
        let into = Self {
            email: Email::unvalidated(from.to_owned()),
        };

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}

/// A reset token and its expiry.
///
/// The token and the timestamp only ever travel together. An account either
/// has a pending reset with both values, or neither. Persistence layers map
/// this to their two nullable fields and must refuse rows where only one is
/// set.
#[derive(Clone, Debug)]
pub struct PendingReset {
    token: String,
    expires_at: DateTime<Utc>,
}

impl PendingReset {
    /// Start a pending reset with a freshly generated token that expires
    /// [`RESET_TOKEN_TTL_SECONDS`] after the provided issuance time.
    pub fn start(issued_at: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; RESET_TOKEN_BYTES];
        thread_rng().fill_bytes(&mut bytes);

        let token = bytes
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect::<String>();

        Self {
            token,
            expires_at: issued_at + Duration::seconds(RESET_TOKEN_TTL_SECONDS),
        }
    }

    /// Reconstruct a pending reset from persisted values.
    pub fn from_parts(token: String, expires_at: DateTime<Utc>) -> Self {
        Self { token, expires_at }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// A token is only usable while its expiry is strictly in the future.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// The opaque path segment delivered to the account owner.
    pub fn reference_path(&self) -> String {
        format!("/account/reset/{}", self.token)
    }
}
