use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::time::Duration;

use super::RateLimit;
use crate::{ErrorKind, Result};

/// Token bucket rate limiter shared by all workers.
///
/// The bucket holds a single token, so bursts are not possible:
/// after the first request, requests are spaced by `1 / rate` seconds.
#[derive(Debug)]
pub struct TokenBucket {
    rate: f64,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl TokenBucket {
    /// Create a token bucket refilling `rate` times per second
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidRate`] if the refill interval is not a
    /// positive duration, or too long for the clock to represent in
    /// nanoseconds.
    pub fn per_second(rate: f64) -> Result<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ErrorKind::InvalidRate(rate));
        }
        let period = Duration::try_from_secs_f64(rate.recip())
            .map_err(|_| ErrorKind::InvalidRate(rate))?;
        if period > Duration::from_nanos(u64::MAX) {
            return Err(ErrorKind::InvalidRate(rate));
        }
        let quota = Quota::with_period(period)
            .ok_or(ErrorKind::InvalidRate(rate))?
            .allow_burst(NonZeroU32::MIN);

        Ok(Self {
            rate,
            rate_limiter: RateLimiter::direct(quota),
        })
    }

    /// Requests per second
    #[must_use]
    pub const fn rate(&self) -> f64 {
        self.rate
    }
}

#[async_trait]
impl RateLimit for TokenBucket {
    async fn acquire(&self) {
        self.rate_limiter.until_ready().await;
    }
}
