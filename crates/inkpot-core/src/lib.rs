//! Core library for Inkpot, an AI-assisted creative-writing application.
//!
//! The UI layer (wizard screens, modals, panels), prompt templates, and the
//! AI provider HTTP client live elsewhere; this crate carries the pieces they
//! all share:
//! - `net` - network resilience: retry with exponential backoff, and an
//!   offline queue that defers work until connectivity returns
//! - `storage` - session-scoped key-value storage for lightweight metadata

pub mod net;
pub mod storage;

pub use net::connectivity::ConnectivityMonitor;
pub use net::error::{NetError, QueueError};
pub use net::queue::{
    AddOptions, Dispatch, ItemStatus, OfflineQueue, QueueHooks, QueueItem, QueueOperation,
};
pub use net::retry::{
    compute_delay, is_retryable_status, with_retry, with_retry_hooks, IsRetryable, RetryHooks,
    RetryPolicy,
};
pub use storage::{MemorySessionStore, SessionStore};
