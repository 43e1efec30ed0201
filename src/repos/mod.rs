mod accounts;
mod reviews;

#[cfg(test)]
pub mod testing;

pub use accounts::{Account, AccountRepo, AccountRepoError, DynAccountRepo};
pub use reviews::{DynReviewRepo, ReviewRepo};
