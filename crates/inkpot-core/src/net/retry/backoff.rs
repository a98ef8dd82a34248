//! Backoff policy and delay calculation

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Retry policy: how many times to retry and how long to wait in between.
///
/// Total attempts = `max_retries` + 1. A policy with `max_retries = 0`
/// performs exactly one attempt and never waits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base wait before the first retry. Must be non-zero.
    pub initial_delay: Duration,
    /// Upper bound on any single wait. Must be >= `initial_delay`.
    pub max_delay: Duration,
    /// Multiplicative growth per attempt. Must be > 1.
    pub backoff_factor: f64,
    /// Randomize each delay by a uniform factor in [0.5, 1.5).
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Check the policy invariants.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.initial_delay.is_zero(), "initial_delay must be > 0");
        anyhow::ensure!(
            self.max_delay >= self.initial_delay,
            "max_delay must be >= initial_delay"
        );
        anyhow::ensure!(self.backoff_factor > 1.0, "backoff_factor must be > 1");
        Ok(())
    }
}

/// Compute the wait before the retry following failed attempt `attempt`
/// (0-indexed): `initial_delay * backoff_factor^attempt`, jittered when the
/// policy asks for it, clamped to `max_delay`.
///
/// Large attempt numbers saturate at `max_delay` instead of overflowing.
pub fn compute_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    let max_secs = policy.max_delay.as_secs_f64();
    let exponent = attempt.min(i32::MAX as u32) as i32;
    let raw = policy.initial_delay.as_secs_f64() * policy.backoff_factor.powi(exponent);
    let mut secs = if raw.is_finite() { raw } else { max_secs };
    if policy.jitter {
        secs *= rand::thread_rng().gen_range(0.5..1.5);
    }
    Duration::from_secs_f64(secs.min(max_secs))
}

/// Whether an HTTP status code indicates a transient failure worth retrying:
/// request timeout (408), rate limiting (429), or any server error (5xx).
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429) || status >= 500
}

/// Classifies an error for the retry executor.
///
/// Implemented by [`NetError`](crate::net::error::NetError) for provider
/// calls; test doubles and other error types implement it at the seam.
pub trait IsRetryable {
    /// Whether re-attempting the operation is expected to plausibly succeed.
    fn is_retryable(&self) -> bool;

    /// Whether this error is a cancellation signal. Cancellation always
    /// propagates immediately, bypassing the retry predicate.
    fn is_cancellation(&self) -> bool {
        false
    }

    /// Construct the error the executor fails with when its cancellation
    /// token fires.
    fn cancelled() -> Self
    where
        Self: Sized;
}
