//! Fixed-window rate limiting
//!
//! Requests are counted per identity in wall-clock buckets of `window`
//! seconds: `bucket = floor(now / window)`. The first request of a bucket
//! creates the counter and gives it a TTL of one window, so stale buckets
//! clean themselves up.
//!
//! This is a fixed window, not a sliding one. A client can spend its whole
//! allowance at the end of one window and again at the start of the next,
//! i.e. up to `2 * limit` requests across a boundary. Callers size their
//! limits with that in mind.
//!
//! The limiter only sees the identity string it is given; callers sharing an
//! identity (e.g. behind one proxy address) share a counter.

use crate::cache::keys::rate_limit_key;
use crate::clock::Clock;
use crate::error::{CacheError, Result};
use crate::store::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A limit and the window it applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub limit: u64,
    pub window: Duration,
}

impl RateLimitRule {
    pub const fn new(limit: u64, window: Duration) -> Self {
        Self { limit, window }
    }

    pub const fn per_minute(limit: u64) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }
}

/// Outcome of one counted request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests counted in this window, including this one
    pub count: u64,
    pub limit: u64,
    pub remaining: u64,
    /// Unix seconds at which the current window ends
    pub reset_at: u64,
}

impl RateLimitDecision {
    /// Seconds until the window resets, as of `now_unix`
    pub fn retry_after(&self, now_unix: u64) -> u64 {
        self.reset_at.saturating_sub(now_unix)
    }
}

/// What to do when the store cannot be asked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Admit the request
    FailOpen,
    /// Reject the request
    FailClosed,
}

/// Per-identity request counter over fixed wall-clock windows
pub struct FixedWindowRateLimiter {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl FixedWindowRateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Count one request for `identity` and report whether it is within `limit`.
    ///
    /// Store failures are returned; see [`Self::allow_or`] for an explicit
    /// fail-open or fail-closed choice.
    pub async fn allow(&self, identity: &str, limit: u64, window: Duration) -> Result<bool> {
        Ok(self.check(identity, limit, window).await?.allowed)
    }

    /// Like [`Self::allow`], with the details needed for rate-limit headers
    pub async fn check(
        &self,
        identity: &str,
        limit: u64,
        window: Duration,
    ) -> Result<RateLimitDecision> {
        let window_secs = window.as_secs();
        if window_secs == 0 {
            return Err(CacheError::ConfigError(
                "rate limit window must be at least one second".to_string(),
            ));
        }

        let bucket = self.clock.unix_seconds() / window_secs;
        let key = rate_limit_key(identity, bucket);

        let count = self.store.increment(&key).await?.max(0) as u64;
        if count == 1 {
            self.store.expire(&key, window).await?;
        }

        let allowed = count <= limit;
        if !allowed {
            debug!("Rate limit exceeded for {} ({}/{})", identity, count, limit);
        }

        Ok(RateLimitDecision {
            allowed,
            count,
            limit,
            remaining: limit.saturating_sub(count),
            reset_at: bucket.saturating_add(1).saturating_mul(window_secs),
        })
    }

    pub async fn check_rule(&self, identity: &str, rule: RateLimitRule) -> Result<RateLimitDecision> {
        self.check(identity, rule.limit, rule.window).await
    }

    /// [`Self::allow`], resolving store failures with the caller's policy
    pub async fn allow_or(
        &self,
        identity: &str,
        limit: u64,
        window: Duration,
        policy: FailurePolicy,
    ) -> bool {
        match self.allow(identity, limit, window).await {
            Ok(allowed) => allowed,
            Err(e) => {
                let admit = policy == FailurePolicy::FailOpen;
                warn!(
                    "Rate limiter unavailable for {} ({:?}, admitting: {}): {}",
                    identity, policy, admit, e
                );
                admit
            }
        }
    }
}
