use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::{
    accounts::domain::email::Email,
    passwords::Hash,
    repos::{Account, AccountRepoError, DynAccountRepo},
};

pub type DynCredentialVerifier = Arc<dyn CredentialVerifier + Send + Sync>;

#[derive(Debug, Error)]
pub enum VerifyCredentialsError {
    #[error("account store is unavailable")]
    StoreUnavailable(#[from] AccountRepoError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A pluggable credential check.
#[async_trait]
pub trait CredentialVerifier {
    /// Check an identifier and secret, returning the matching account when
    /// the pair is valid. Unknown identifiers and wrong secrets are
    /// indistinguishable to the caller.
    async fn verify(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<Option<Account>, VerifyCredentialsError>;
}

/// Verifies an email and password pair against the account store.
pub struct PasswordCredentialVerifier {
    account_repo: DynAccountRepo,
}

impl PasswordCredentialVerifier {
    pub fn new(account_repo: DynAccountRepo) -> Self {
        Self { account_repo }
    }
}

#[async_trait]
impl CredentialVerifier for PasswordCredentialVerifier {
    async fn verify(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<Option<Account>, VerifyCredentialsError> {
        let email = Email::unvalidated(identifier.to_owned());

        let account = match self.account_repo.find_by_email(email.normalized()).await? {
            Some(account) => account,
            None => return Ok(None),
        };

        let hash = Hash::from_hash_str(&account.password_hash)
            .context("invalid password hash received from the account store")?;

        if hash.matches_raw_password(secret)? {
            debug!(user_id = %account.id, "Validated user credentials.");

            Ok(Some(account))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod test {
    use uuid::Uuid;

    use crate::{passwords::Password, repos::testing::InMemoryAccountRepo};

    use super::*;

    fn account_with_password(email: &str, password: &str) -> Account {
        Account {
            id: Uuid::new_v4(),
            email: email.to_owned(),
            password_hash: Hash::new(&Password::unvalidated(password.to_owned()))
                .expect("password should hash")
                .value()
                .to_owned(),
            pending_reset: None,
        }
    }

    fn verifier(accounts: Vec<Account>) -> PasswordCredentialVerifier {
        PasswordCredentialVerifier::new(Arc::new(InMemoryAccountRepo::with_accounts(accounts)))
    }

    #[tokio::test]
    async fn verify_accepts_correct_credentials() {
        let account = account_with_password("user@example.com", "hunter2hunter2");
        let account_id = account.id;
        let verifier = verifier(vec![account]);

        let verified = verifier
            .verify("user@example.com", "hunter2hunter2")
            .await
            .expect("verification should not error");

        assert_eq!(Some(account_id), verified.map(|account| account.id));
    }

    #[tokio::test]
    async fn verify_rejects_wrong_password() {
        let verifier = verifier(vec![account_with_password(
            "user@example.com",
            "hunter2hunter2",
        )]);

        let verified = verifier
            .verify("user@example.com", "not-the-password")
            .await
            .expect("verification should not error");

        assert!(verified.is_none());
    }

    #[tokio::test]
    async fn verify_rejects_unknown_identifier() {
        let verifier = verifier(vec![]);

        let verified = verifier
            .verify("nobody@example.com", "hunter2hunter2")
            .await
            .expect("verification should not error");

        assert!(verified.is_none());
    }

    #[tokio::test]
    async fn verify_normalizes_identifier_domain() {
        let account = account_with_password("user@example.com", "hunter2hunter2");
        let account_id = account.id;
        let verifier = verifier(vec![account]);

        let verified = verifier
            .verify("user@EXAMPLE.com", "hunter2hunter2")
            .await
            .expect("verification should not error");

        assert_eq!(Some(account_id), verified.map(|account| account.id));
    }
}
