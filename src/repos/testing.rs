//! In-memory test doubles for the repository traits.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::accounts::domain::resets::PendingReset;

use super::{Account, AccountRepo, AccountRepoError};

/// An [`AccountRepo`] backed by a vector of accounts.
#[derive(Default)]
pub struct InMemoryAccountRepo {
    accounts: Mutex<Vec<Account>>,
    writes: AtomicUsize,
}

impl InMemoryAccountRepo {
    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        Self {
            accounts: Mutex::new(accounts),
            writes: AtomicUsize::new(0),
        }
    }

    /// The number of write operations the store has received.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get(&self, account_id: Uuid) -> Option<Account> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|account| account.id == account_id)
            .cloned()
    }
}

fn holds_valid_token(account: &Account, token: &str, now: DateTime<Utc>) -> bool {
    account
        .pending_reset
        .as_ref()
        .map_or(false, |reset| reset.token() == token && !reset.is_expired_at(now))
}

#[async_trait]
impl AccountRepo for InMemoryAccountRepo {
    async fn find_by_email(
        &self,
        normalized_email: &str,
    ) -> Result<Option<Account>, AccountRepoError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|account| account.email == normalized_email)
            .cloned())
    }

    async fn find_by_valid_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, AccountRepoError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|account| holds_valid_token(account, token, now))
            .cloned())
    }

    async fn save_pending_reset(
        &self,
        account_id: Uuid,
        reset: &PendingReset,
    ) -> Result<(), AccountRepoError> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.iter_mut().find(|account| account.id == account_id) {
            account.pending_reset = Some(reset.clone());
        }

        Ok(())
    }

    async fn consume_pending_reset(
        &self,
        token: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> Result<Option<Account>, AccountRepoError> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        let mut accounts = self.accounts.lock().unwrap();
        match accounts
            .iter_mut()
            .find(|account| holds_valid_token(account, token, now))
        {
            Some(account) => {
                account.password_hash = new_password_hash.to_owned();
                account.pending_reset = None;

                Ok(Some(account.clone()))
            }
            None => Ok(None),
        }
    }
}
