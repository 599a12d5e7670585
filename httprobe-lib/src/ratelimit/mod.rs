//! Global request rate limiting.
//!
//! Every probe attempt, HTTPS or HTTP, acquires a permit from the same
//! limiter before it goes out, so the configured rate is an aggregate
//! ceiling across both worker pools.
//!
//! - [`RateLimit`]: the capability the worker pools are given
//! - [`Unlimited`]: never waits
//! - [`TokenBucket`]: a token bucket with a single token, backed by governor

mod bucket;

pub use bucket::TokenBucket;

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::{ErrorKind, Result};

/// A gate that every probe passes before it is sent.
///
/// Acquiring may suspend the caller but never fails.
#[async_trait]
pub trait RateLimit: Send + Sync + Debug {
    /// Wait until the next request may be issued
    async fn acquire(&self);
}

/// No rate limit at all
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

#[async_trait]
impl RateLimit for Unlimited {
    async fn acquire(&self) {}
}

/// Create the limiter for `rate` requests per second.
///
/// A rate of `0` means unlimited.
///
/// # Errors
///
/// Returns [`ErrorKind::InvalidRate`] if `rate` is negative, not finite,
/// so large that the interval between two requests rounds to zero, or so
/// small that the interval overflows the limiter's clock.
pub fn limiter(rate: f64) -> Result<Arc<dyn RateLimit>> {
    if rate == 0.0 {
        return Ok(Arc::new(Unlimited));
    }
    if !rate.is_finite() || rate < 0.0 {
        return Err(ErrorKind::InvalidRate(rate));
    }
    Ok(Arc::new(TokenBucket::per_second(rate)?))
}
