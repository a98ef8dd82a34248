//! Queue item records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a queue item.
///
/// Transitions only `Pending -> Processing -> {Completed, Failed}`.
/// `Completed` items leave the queue as soon as the completion callback has
/// fired; `Failed` items stay until the caller removes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Metadata record for a queued operation.
///
/// This is what gets snapshotted to the session store. The operation closure
/// lives in the manager's in-memory table keyed by `id` and is never
/// serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub status: ItemStatus,
    /// Retry attempts consumed so far by the current processing run.
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Higher values are processed first; ties break by insertion order.
    pub priority: i32,
    /// Caller-supplied context, persisted for inspection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Populated on success just long enough for the completion callback.
    #[serde(skip)]
    pub result: Option<serde_json::Value>,
    /// Insertion counter, used to keep the priority sort stable.
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl QueueItem {
    pub(crate) fn new(
        id: String,
        priority: i32,
        metadata: Option<serde_json::Value>,
        seq: u64,
    ) -> Self {
        Self {
            id,
            status: ItemStatus::Pending,
            retry_count: 0,
            created_at: Utc::now(),
            last_attempt_at: None,
            last_error: None,
            priority,
            metadata,
            result: None,
            seq,
        }
    }
}

/// Options for [`OfflineQueue::add`](super::OfflineQueue::add).
#[derive(Debug, Default)]
pub struct AddOptions {
    /// Caller-supplied id. Generated (`"{unix_millis}-{random hex}"`) when
    /// absent. Duplicate ids are rejected.
    pub id: Option<String>,
    pub priority: i32,
    pub metadata: Option<serde_json::Value>,
}

pub(crate) fn generate_item_id() -> String {
    format!(
        "{}-{:08x}",
        Utc::now().timestamp_millis(),
        rand::random::<u32>()
    )
}
