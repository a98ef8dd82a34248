//! Network resilience layer
//!
//! Everything the client needs to keep AI provider calls alive on a flaky
//! connection:
//! - `retry` - exponential backoff with jitter for transient failures
//! - `queue` - offline queue that holds operations while disconnected and
//!   replays them when connectivity returns
//! - `connectivity` - the online/offline signal the queue observes
//! - `error` - the failure taxonomy shared by all of the above

pub mod connectivity;
pub mod error;
pub mod queue;
pub mod retry;
