mod redis;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub use self::redis::RedisRateLimiter;

pub type DynRateLimiter = Arc<dyn RateLimiter>;

#[derive(Debug, Error)]
pub enum RateLimitError {
    /// The per-minute budget for the key has been spent. Requests will be
    /// accepted again at the contained timestamp.
    #[error("rate limited until {0}")]
    LimitedUntil(DateTime<Utc>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A requests-per-minute definition of a rate limiter.
pub trait RateLimiter: Send + Sync {
    /// Record an operation against a rate limited resource.
    ///
    /// # Arguments
    ///
    /// * `key` - A unique key for the resource being rate limited. In the
    ///   context of a web request, this should encapsulate the request path and
    ///   method, as well as the actor making the request.
    /// * `max_req_per_min` - The maximum number of operations allowed for the
    ///   key in a given minute.
    ///
    /// # Returns
    ///
    /// [`Ok`] if the operation was recorded without exceeding the key's
    /// budget. [`RateLimitError::LimitedUntil`] if the budget has been spent.
    fn record_operation(&self, key: &str, max_req_per_min: u64) -> Result<(), RateLimitError>;
}
