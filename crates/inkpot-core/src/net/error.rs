//! Failure taxonomy for the network layer
//!
//! Splits failures into the three classes the retry machinery cares about:
//! transient (retried with backoff), permanent (surfaced immediately), and
//! cancellation (short-circuits everything, never retried).

use thiserror::Error;

use super::retry::{is_retryable_status, IsRetryable};

/// Errors produced by network operations.
///
/// Provider clients map their transport failures onto these variants so the
/// retry executor can classify them without knowing request shapes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetError {
    #[error("request timed out")]
    Timeout,

    #[error("connection reset by peer")]
    ConnectionReset,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("dns lookup failed: {0}")]
    Dns(String),

    /// Generic request failure with no more specific classification
    /// (the fetch itself failed, not the server's answer).
    #[error("request failed: {0}")]
    Network(String),

    #[error("http {status}: {message}")]
    Http { status: u16, message: String },

    #[error("operation canceled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl IsRetryable for NetError {
    fn is_retryable(&self) -> bool {
        match self {
            NetError::Timeout
            | NetError::ConnectionReset
            | NetError::ConnectionRefused
            | NetError::Dns(_)
            | NetError::Network(_) => true,
            NetError::Http { status, .. } => is_retryable_status(*status),
            NetError::Cancelled | NetError::Other(_) => false,
        }
    }

    fn is_cancellation(&self) -> bool {
        matches!(self, NetError::Cancelled)
    }

    fn cancelled() -> Self {
        NetError::Cancelled
    }
}

/// Errors from the offline queue's own bookkeeping, as opposed to failures
/// of the operations it runs (those surface via item state and callbacks).
#[derive(Debug, Error)]
pub enum QueueError {
    /// `add` was called with an id that is already live in the queue.
    /// Exactly one item per id may exist at a time; re-submission of a
    /// failed item requires removing it first.
    #[error("queue item with id '{0}' already exists")]
    DuplicateId(String),

    #[error("queue has been disposed")]
    Disposed,

    #[error(transparent)]
    Net(#[from] NetError),
}
