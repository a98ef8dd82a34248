//! Rate limiting and retry logic
//!
//! Provides exponential backoff with jitter for handling API rate limits and
//! transient errors.
//!
//! Used by provider calls and the offline queue to handle transient errors
//! like rate limiting (429) and server errors (500, 502, 503, 504).

mod backoff;
mod execute;

pub use backoff::{compute_delay, is_retryable_status, IsRetryable, RetryPolicy};
pub use execute::{with_retry, with_retry_hooks, RetryHooks};
