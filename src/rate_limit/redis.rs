use chrono::{Duration, DurationRound, Utc};

use super::{RateLimitError, RateLimiter};

/// A fixed-window rate limiter backed by Redis.
pub struct RedisRateLimiter {
    client: redis::Client,
}

impl RedisRateLimiter {
    /// Create a new rate limiter.
    ///
    /// # Arguments
    ///
    /// * `connection_uri` - The connection string used to connect to Redis.
    pub fn new(connection_uri: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: redis::Client::open(connection_uri)?,
        })
    }
}

impl RateLimiter for RedisRateLimiter {
    fn record_operation(&self, key: &str, max_req_per_min: u64) -> Result<(), RateLimitError> {
        let mut conn = self.client.get_connection().map_err(anyhow::Error::from)?;

        // Windows have minute granularity, so the current minute is enough to
        // distinguish the active window. By the time the same minute comes
        // around again, the previous window's key will have expired 58 minutes
        // earlier.
        let now = Utc::now();
        let window_key = format!("{}:{}", key, now.format("%M"));

        // Unconditionally count the operation and refresh the window's
        // expiration in one atomic pipeline. Counting before checking means a
        // client that keeps hammering a limited endpoint never gets its
        // window back early.
        let (hits,): (u64,) = redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(&window_key)
            .cmd("EXPIRE")
            .arg(&window_key)
            .arg(59)
            .ignore()
            .query(&mut conn)
            .map_err(anyhow::Error::from)?;

        if hits > max_req_per_min {
            let window_end = (now + Duration::minutes(1))
                .duration_trunc(Duration::minutes(1))
                .map_err(anyhow::Error::from)?;

            return Err(RateLimitError::LimitedUntil(window_end));
        }

        Ok(())
    }
}
