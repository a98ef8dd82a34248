//! Queue lifecycle callbacks
//!
//! The UI wires these to toasts, badges, and the sync indicator. All hooks
//! are optional and run synchronously on the queue's processing task, so
//! they should hand heavy work off rather than doing it inline.

use serde_json::Value;

use super::item::QueueItem;
use crate::net::error::NetError;

type ItemHook = Box<dyn Fn(&QueueItem) + Send + Sync>;
type CompletionHook = Box<dyn Fn(&QueueItem, &Value) + Send + Sync>;
type FailureHook = Box<dyn Fn(&QueueItem, &NetError) + Send + Sync>;
type SignalHook = Box<dyn Fn() + Send + Sync>;

/// Lifecycle callbacks for [`OfflineQueue`](super::OfflineQueue).
#[derive(Default)]
pub struct QueueHooks {
    /// An item was accepted into the queue.
    pub on_item_added: Option<ItemHook>,
    /// An item's operation succeeded. The item is removed from the queue
    /// immediately after this returns.
    pub on_item_completed: Option<CompletionHook>,
    /// An item's operation failed for good (retries exhausted, permanent
    /// error, or cancellation). The item stays in the queue as `Failed`.
    pub on_item_failed: Option<FailureHook>,
    /// A drain pass finished with nothing left pending.
    pub on_queue_empty: Option<SignalHook>,
    /// Connectivity came back; a drain is about to start.
    pub on_online_resume: Option<SignalHook>,
}
