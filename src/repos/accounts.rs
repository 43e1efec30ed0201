use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{accounts::domain::resets::PendingReset, database::PostgresConnection};

/// A stored user account.
#[derive(Clone, Debug)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub pending_reset: Option<PendingReset>,
}

#[derive(Debug, Error)]
pub enum AccountRepoError {
    /// The account store could not be reached, or a read/write failed.
    #[error("account store is unavailable")]
    Unavailable(#[source] anyhow::Error),
}

impl From<sqlx::Error> for AccountRepoError {
    fn from(error: sqlx::Error) -> Self {
        Self::Unavailable(error.into())
    }
}

pub type DynAccountRepo = Arc<dyn AccountRepo + Send + Sync>;

#[async_trait]
pub trait AccountRepo {
    /// Look up an account by its normalized email address.
    async fn find_by_email(
        &self,
        normalized_email: &str,
    ) -> Result<Option<Account>, AccountRepoError>;

    /// Look up the account holding `token` with an expiry strictly after
    /// `now`. Tokens are unique across accounts, so at most one account can
    /// match.
    async fn find_by_valid_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, AccountRepoError>;

    /// Attach a pending reset to an account, replacing any reset that is
    /// already pending. Both reset fields are written in a single statement.
    async fn save_pending_reset(
        &self,
        account_id: Uuid,
        reset: &PendingReset,
    ) -> Result<(), AccountRepoError>;

    /// Set a new password hash and clear the pending reset on the account
    /// holding a still-valid `token`, all in one atomic write. Returns the
    /// updated account, or [`None`] when no account holds an unexpired
    /// matching token.
    async fn consume_pending_reset(
        &self,
        token: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> Result<Option<Account>, AccountRepoError>;
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    password: String,
    reset_token: Option<String>,
    reset_token_expires_at: Option<DateTime<Utc>>,
}

impl AccountRow {
    fn into_account(self) -> Result<Account, AccountRepoError> {
        let pending_reset = match (self.reset_token, self.reset_token_expires_at) {
            (Some(token), Some(expires_at)) => Some(PendingReset::from_parts(token, expires_at)),
            (None, None) => None,
            // The schema's check constraint should make this unrepresentable,
            // so a mixed row means the store is corrupted.
            _ => {
                return Err(AccountRepoError::Unavailable(anyhow!(
                    "account {} has a reset token and expiry that are not paired",
                    self.id
                )))
            }
        };

        Ok(Account {
            id: self.id,
            email: self.email,
            password_hash: self.password,
            pending_reset,
        })
    }
}

const ACCOUNT_COLUMNS: &str = "id, email, password, reset_token, reset_token_expires_at";

#[async_trait]
impl AccountRepo for PostgresConnection {
    async fn find_by_email(
        &self,
        normalized_email: &str,
    ) -> Result<Option<Account>, AccountRepoError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            SELECT {}
            FROM account
            WHERE email = $1
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(normalized_email)
        .fetch_optional(&**self)
        .await?;

        row.map(AccountRow::into_account).transpose()
    }

    async fn find_by_valid_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, AccountRepoError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            SELECT {}
            FROM account
            WHERE reset_token = $1 AND reset_token_expires_at > $2
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(token)
        .bind(now)
        .fetch_optional(&**self)
        .await?;

        row.map(AccountRow::into_account).transpose()
    }

    async fn save_pending_reset(
        &self,
        account_id: Uuid,
        reset: &PendingReset,
    ) -> Result<(), AccountRepoError> {
        sqlx::query(
            r#"
            UPDATE account
            SET reset_token = $2, reset_token_expires_at = $3
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .bind(reset.token())
        .bind(reset.expires_at())
        .execute(&**self)
        .await?;

        Ok(())
    }

    async fn consume_pending_reset(
        &self,
        token: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> Result<Option<Account>, AccountRepoError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            UPDATE account
            SET password = $3, reset_token = NULL, reset_token_expires_at = NULL
            WHERE reset_token = $1 AND reset_token_expires_at > $2
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(token)
        .bind(now)
        .bind(new_password_hash)
        .fetch_optional(&**self)
        .await?;

        row.map(AccountRow::into_account).transpose()
    }
}
