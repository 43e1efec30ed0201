use chrono::Utc;
use tera::Tera;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    email::clients::{DynEmailClient, Message},
    passwords::{Hash, Password},
    repos::{Account, AccountRepoError, DynAccountRepo},
};

use super::domain::resets::{PendingReset, ResetRequest};

#[derive(Debug, Error)]
pub enum IssueResetError {
    #[error("account store is unavailable")]
    StoreUnavailable(#[from] AccountRepoError),

    /// Handing the reset reference to the delivery collaborator failed.
    #[error(transparent)]
    Delivery(anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ValidateResetError {
    #[error("account store is unavailable")]
    StoreUnavailable(#[from] AccountRepoError),
}

#[derive(Debug, Error)]
pub enum ConsumeResetError {
    /// No account holds an unexpired reset matching the presented token.
    #[error("password reset token is invalid or has expired")]
    InvalidOrExpiredToken,

    #[error("account store is unavailable")]
    StoreUnavailable(#[from] AccountRepoError),

    #[error(transparent)]
    Other(anyhow::Error),
}

/// The outcome of requesting a password reset.
///
/// Callers must report both variants identically so that the response never
/// reveals whether an address is registered.
#[derive(Debug)]
pub enum IssuedReset {
    /// A token was stored on the account and its reference handed off for
    /// out-of-band delivery. The contained path is the delivered reference.
    TokenDelivered(String),

    /// No account matched the address. Nothing was written.
    NoMatchingAccount,
}

/// A service object managing the reset-token lifecycle: issue, validate,
/// consume.
#[derive(Clone)]
pub struct PasswordResetService {
    account_repo: DynAccountRepo,
    base_url: String,
    email_client: DynEmailClient,
    templates: Tera,
}

impl PasswordResetService {
    /// Create a new password reset service.
    ///
    /// # Arguments
    ///
    /// * `account_repo` - The repository used to query and update accounts.
    /// * `base_url` - The externally reachable base URL prepended to reset
    ///   reference paths in delivered emails.
    /// * `email_client` - The client used to deliver reset references.
    /// * `templates` - The templating engine used to compose email content.
    pub fn new(
        account_repo: DynAccountRepo,
        base_url: String,
        email_client: DynEmailClient,
        templates: Tera,
    ) -> Self {
        Self {
            account_repo,
            base_url,
            email_client,
            templates,
        }
    }

    /// Issue a single-use reset token for the account registered under the
    /// requested email address.
    ///
    /// The token expires one hour after issuance and replaces any reset that
    /// is already pending for the account, so at most one token is live per
    /// account. When no account matches the address, nothing is written and
    /// the owner of the address is notified instead. The store never learns
    /// about the failed match, and neither does the HTTP client.
    pub async fn issue_reset(&self, request: ResetRequest) -> Result<IssuedReset, IssueResetError> {
        let address = request.email().address().to_owned();

        let account = self
            .account_repo
            .find_by_email(request.email().normalized())
            .await?;

        let account = match account {
            Some(account) => account,
            None => {
                let content = self
                    .templates
                    .render("emails/reset_password_no_account.txt", &tera::Context::new())
                    .map_err(|error| IssueResetError::Delivery(error.into()))?;

                self.email_client
                    .send(&Message {
                        to: address,
                        subject: "Password Reset Attempt".to_owned(),
                        text: content,
                    })
                    .await
                    .map_err(IssueResetError::Delivery)?;

                info!("Sent password reset attempt notification to unknown address.");

                return Ok(IssuedReset::NoMatchingAccount);
            }
        };

        let reset = PendingReset::start(Utc::now());

        self.account_repo
            .save_pending_reset(account.id, &reset)
            .await?;

        debug!(user_id = %account.id, "Stored pending password reset.");

        let reference = reset.reference_path();

        let mut context = tera::Context::new();
        context.insert("base_url", &self.base_url);
        context.insert("reset_path", &reference);

        let content = self
            .templates
            .render("emails/reset_password_token.txt", &context)
            .map_err(|error| IssueResetError::Delivery(error.into()))?;

        self.email_client
            .send(&Message {
                to: address,
                subject: "Reset Your Password".to_owned(),
                text: content,
            })
            .await
            .map_err(IssueResetError::Delivery)?;

        info!(user_id = %account.id, "Sent password reset token to account's email.");

        Ok(IssuedReset::TokenDelivered(reference))
    }

    /// Find the account holding an unexpired reset matching `token`.
    ///
    /// Reads only. Repeated calls with the same still-valid token return the
    /// same account.
    pub async fn validate_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<Account>, ValidateResetError> {
        Ok(self
            .account_repo
            .find_by_valid_reset_token(token, Utc::now())
            .await?)
    }

    /// Exchange a valid reset token for a new password.
    ///
    /// The password update and the removal of the token happen in one atomic
    /// store write, so a consumed token can never validate again and the
    /// account's reset fields are always cleared together.
    pub async fn consume_reset(
        &self,
        token: &str,
        new_password: Password,
    ) -> Result<Account, ConsumeResetError> {
        let hash = Hash::new(&new_password).map_err(ConsumeResetError::Other)?;

        let updated = self
            .account_repo
            .consume_pending_reset(token, Utc::now(), hash.value())
            .await?;

        match updated {
            Some(account) => {
                info!(user_id = %account.id, "Reset account password with reset token.");

                Ok(account)
            }
            None => Err(ConsumeResetError::InvalidOrExpiredToken),
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::Duration;
    use uuid::Uuid;

    use crate::{
        email::clients::EmailClient,
        repos::testing::InMemoryAccountRepo,
    };

    use super::*;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<Message>>,
    }

    impl RecordingMailer {
        fn messages(&self) -> Vec<(String, String)> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|message| (message.to.clone(), message.text.clone()))
                .collect()
        }
    }

    #[async_trait]
    impl EmailClient for RecordingMailer {
        async fn send(&self, message: &Message) -> Result<()> {
            self.sent.lock().unwrap().push(Message {
                to: message.to.clone(),
                subject: message.subject.clone(),
                text: message.text.clone(),
            });

            Ok(())
        }
    }

    fn templates() -> Tera {
        let mut tera = Tera::default();
        tera.add_raw_template(
            "emails/reset_password_token.txt",
            "Reset your password: {{ base_url }}{{ reset_path }}",
        )
        .unwrap();
        tera.add_raw_template(
            "emails/reset_password_no_account.txt",
            "No account is registered under this address.",
        )
        .unwrap();

        tera
    }

    fn account(email: &str) -> Account {
        Account {
            id: Uuid::new_v4(),
            email: email.to_owned(),
            password_hash: "old-hash".to_owned(),
            pending_reset: None,
        }
    }

    fn service(
        accounts: Vec<Account>,
    ) -> (
        PasswordResetService,
        Arc<InMemoryAccountRepo>,
        Arc<RecordingMailer>,
    ) {
        let repo = Arc::new(InMemoryAccountRepo::with_accounts(accounts));
        let mailer = Arc::new(RecordingMailer::default());
        let service = PasswordResetService::new(
            repo.clone(),
            "https://reviews.example.com".to_owned(),
            mailer.clone(),
            templates(),
        );

        (service, repo, mailer)
    }

    fn request(address: &str) -> ResetRequest {
        use semval::ValidatedFrom;

        ResetRequest::validated_from(address).expect("address should be valid")
    }

    fn stored_token(repo: &InMemoryAccountRepo, account_id: Uuid) -> String {
        repo.get(account_id)
            .expect("account should exist")
            .pending_reset
            .expect("a reset should be pending")
            .token()
            .to_owned()
    }

    #[tokio::test]
    async fn issue_persists_token_and_delivers_reference() {
        let user = account("user@example.com");
        let user_id = user.id;
        let (service, repo, mailer) = service(vec![user]);

        let before = Utc::now();
        let outcome = service
            .issue_reset(request("user@example.com"))
            .await
            .expect("issuing should succeed");

        let reference = match outcome {
            IssuedReset::TokenDelivered(reference) => reference,
            other => panic!("expected a delivered token, got {:?}", other),
        };

        let token = reference
            .strip_prefix("/account/reset/")
            .expect("reference should be a reset path");
        assert_eq!(64, token.len());
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

        let reset = repo
            .get(user_id)
            .unwrap()
            .pending_reset
            .expect("a reset should be pending");
        assert_eq!(token, reset.token());
        assert!(reset.expires_at() > before + Duration::seconds(3590));
        assert!(reset.expires_at() <= Utc::now() + Duration::seconds(3600));

        assert_eq!(1, repo.write_count());

        let messages = mailer.messages();
        assert_eq!(1, messages.len());
        assert_eq!("user@example.com", messages[0].0);
        assert!(
            messages[0]
                .1
                .contains(&format!("https://reviews.example.com{}", reference)),
            "delivered email should contain the reset link: {:?}",
            messages[0].1
        );
    }

    #[tokio::test]
    async fn issue_matches_email_domain_case_insensitively() {
        let (service, _, _) = service(vec![account("user@example.com")]);

        let outcome = service
            .issue_reset(request("user@EXAMPLE.com"))
            .await
            .expect("issuing should succeed");

        assert!(matches!(outcome, IssuedReset::TokenDelivered(_)));
    }

    #[tokio::test]
    async fn issue_matches_email_local_part_case_sensitively() {
        let (service, repo, _) = service(vec![account("user@example.com")]);

        let outcome = service
            .issue_reset(request("USER@example.com"))
            .await
            .expect("issuing should succeed");

        assert!(matches!(outcome, IssuedReset::NoMatchingAccount));
        assert_eq!(0, repo.write_count());
    }

    #[tokio::test]
    async fn issue_for_unknown_email_reports_success_without_a_write() {
        let (service, repo, mailer) = service(vec![account("user@example.com")]);

        let outcome = service
            .issue_reset(request("nobody@example.com"))
            .await
            .expect("issuing should succeed");

        assert!(matches!(outcome, IssuedReset::NoMatchingAccount));
        assert_eq!(0, repo.write_count());

        // The address owner is notified, but no token exists anywhere.
        let messages = mailer.messages();
        assert_eq!(1, messages.len());
        assert_eq!("nobody@example.com", messages[0].0);
        assert!(!messages[0].1.contains("/account/reset/"));
    }

    #[tokio::test]
    async fn issue_replaces_any_pending_token() {
        let user = account("user@example.com");
        let user_id = user.id;
        let (service, repo, _) = service(vec![user]);

        service
            .issue_reset(request("user@example.com"))
            .await
            .expect("first issue should succeed");
        let first_token = stored_token(&repo, user_id);

        service
            .issue_reset(request("user@example.com"))
            .await
            .expect("second issue should succeed");
        let second_token = stored_token(&repo, user_id);

        assert_ne!(first_token, second_token);

        let stale = service
            .validate_reset_token(&first_token)
            .await
            .expect("validation should not error");
        assert!(stale.is_none(), "replaced token should no longer validate");

        let live = service
            .validate_reset_token(&second_token)
            .await
            .expect("validation should not error");
        assert_eq!(Some(user_id), live.map(|account| account.id));
    }

    #[tokio::test]
    async fn validate_is_idempotent_for_a_live_token() {
        let user = account("user@example.com");
        let user_id = user.id;
        let (service, repo, _) = service(vec![user]);

        service
            .issue_reset(request("user@example.com"))
            .await
            .expect("issuing should succeed");
        let token = stored_token(&repo, user_id);
        let writes_after_issue = repo.write_count();

        let first = service.validate_reset_token(&token).await.unwrap();
        let second = service.validate_reset_token(&token).await.unwrap();

        assert_eq!(Some(user_id), first.map(|account| account.id));
        assert_eq!(Some(user_id), second.map(|account| account.id));
        assert_eq!(
            writes_after_issue,
            repo.write_count(),
            "validation must not mutate the store"
        );
    }

    #[tokio::test]
    async fn validate_rejects_unknown_token() {
        let (service, _, _) = service(vec![account("user@example.com")]);

        let result = service
            .validate_reset_token("0000000000000000000000000000000000000000000000000000000000000000")
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn validate_rejects_expired_token() {
        let mut user = account("user@example.com");
        user.pending_reset = Some(PendingReset::from_parts(
            "expired-token".to_owned(),
            Utc::now() - Duration::seconds(1),
        ));
        let (service, _, _) = service(vec![user]);

        let result = service.validate_reset_token("expired-token").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn consume_sets_password_and_clears_reset() {
        let user = account("user@example.com");
        let user_id = user.id;
        let (service, repo, _) = service(vec![user]);

        service
            .issue_reset(request("user@example.com"))
            .await
            .expect("issuing should succeed");
        let token = stored_token(&repo, user_id);

        let updated = service
            .consume_reset(&token, Password::unvalidated("NewPass123!".to_owned()))
            .await
            .expect("consumption should succeed");
        assert_eq!(user_id, updated.id);

        let stored = repo.get(user_id).unwrap();
        assert!(
            stored.pending_reset.is_none(),
            "token and expiry should be cleared together"
        );
        assert!(Hash::from_hash_str(&stored.password_hash)
            .unwrap()
            .matches_raw_password("NewPass123!")
            .unwrap());

        let revalidated = service.validate_reset_token(&token).await.unwrap();
        assert!(revalidated.is_none(), "a consumed token must never validate");
    }

    #[tokio::test]
    async fn consume_is_single_use() {
        let user = account("user@example.com");
        let user_id = user.id;
        let (service, repo, _) = service(vec![user]);

        service
            .issue_reset(request("user@example.com"))
            .await
            .expect("issuing should succeed");
        let token = stored_token(&repo, user_id);

        service
            .consume_reset(&token, Password::unvalidated("NewPass123!".to_owned()))
            .await
            .expect("first consumption should succeed");

        let second = service
            .consume_reset(&token, Password::unvalidated("OtherPass456!".to_owned()))
            .await;

        assert!(matches!(
            second,
            Err(ConsumeResetError::InvalidOrExpiredToken)
        ));
    }

    #[tokio::test]
    async fn consume_rejects_expired_token_without_password_change() {
        let mut user = account("user@example.com");
        user.pending_reset = Some(PendingReset::from_parts(
            "expired-token".to_owned(),
            Utc::now() - Duration::seconds(1),
        ));
        let user_id = user.id;
        let (service, repo, _) = service(vec![user]);

        let result = service
            .consume_reset("expired-token", Password::unvalidated("NewPass123!".to_owned()))
            .await;

        assert!(matches!(
            result,
            Err(ConsumeResetError::InvalidOrExpiredToken)
        ));
        assert_eq!("old-hash", repo.get(user_id).unwrap().password_hash);
    }
}
