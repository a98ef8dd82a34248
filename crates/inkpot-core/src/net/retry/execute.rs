//! Retrying executor
//!
//! Wraps an async operation in an attempt loop: classify the failure, wait
//! out the backoff, try again. Cancellation is cooperative and observed at
//! three points: before each attempt, during the backoff wait, and as a
//! cancellation error returned by the operation itself. The operation future
//! is never raced against the token; an in-flight attempt always settles.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::backoff::{compute_delay, IsRetryable, RetryPolicy};

/// Per-call knobs for [`with_retry_hooks`]. All default to off.
pub struct RetryHooks<'a, E> {
    /// Overrides the error type's own [`IsRetryable`] classification.
    pub should_retry: Option<&'a (dyn Fn(&E) -> bool + Send + Sync)>,
    /// Invoked before each wait with (attempt number, delay, error). The
    /// attempt number is 1-based: the value passed before the first retry
    /// is 1.
    pub on_retry: Option<&'a (dyn Fn(u32, Duration, &E) + Send + Sync)>,
    /// Cooperative cancellation handle.
    pub cancel: Option<&'a CancellationToken>,
}

impl<E> Default for RetryHooks<'_, E> {
    fn default() -> Self {
        Self {
            should_retry: None,
            on_retry: None,
            cancel: None,
        }
    }
}

/// Execute `operation` with retries per `policy`, classifying failures via
/// the error type's [`IsRetryable`] impl.
///
/// Returns the first success, or the last error observed once attempts are
/// exhausted - never a synthetic "retries exhausted" error.
pub async fn with_retry<T, E, F, Fut>(name: &str, policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    E: IsRetryable + fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    with_retry_hooks(name, policy, operation, RetryHooks::default()).await
}

/// Full form of [`with_retry`] with a predicate override, an observability
/// hook, and a cancellation token.
pub async fn with_retry_hooks<T, E, F, Fut>(
    name: &str,
    policy: &RetryPolicy,
    mut operation: F,
    hooks: RetryHooks<'_, E>,
) -> Result<T, E>
where
    E: IsRetryable + fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    debug_assert!(policy.validate().is_ok(), "invalid retry policy");

    let mut attempt: u32 = 0;
    loop {
        if hooks.cancel.is_some_and(CancellationToken::is_cancelled) {
            tracing::debug!("{name}: canceled before attempt {}", attempt + 1);
            return Err(E::cancelled());
        }

        let err = match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::debug!("{name}: succeeded on attempt {}", attempt + 1);
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if err.is_cancellation() {
            tracing::debug!("{name}: canceled during attempt {}", attempt + 1);
            return Err(err);
        }

        let retryable = match hooks.should_retry {
            Some(pred) => pred(&err),
            None => err.is_retryable(),
        };
        if attempt >= policy.max_retries || !retryable {
            tracing::debug!(
                "{name}: giving up after {} attempt(s): {err}",
                attempt + 1
            );
            return Err(err);
        }

        let delay = compute_delay(attempt, policy);
        if let Some(cb) = hooks.on_retry {
            cb(attempt + 1, delay, &err);
        }
        tracing::debug!(
            "{name}: attempt {} failed ({err}), retrying in {:?}",
            attempt + 1,
            delay
        );

        match hooks.cancel {
            Some(token) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = token.cancelled() => {
                        tracing::debug!("{name}: canceled during backoff wait");
                        return Err(E::cancelled());
                    }
                }
            }
            None => tokio::time::sleep(delay).await,
        }

        attempt += 1;
    }
}
