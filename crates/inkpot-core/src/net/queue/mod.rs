//! Offline queue
//!
//! Holds operations submitted while the client is disconnected and replays
//! them, one at a time, when connectivity returns. Item metadata is
//! snapshotted to the session store on every state change so the UI can
//! inspect the backlog; the operation closures themselves only exist in
//! memory, so a restart drops queue contents by design.

mod hooks;
mod item;
mod manager;

pub use hooks::QueueHooks;
pub use item::{AddOptions, ItemStatus, QueueItem};
pub use manager::{Dispatch, OfflineQueue, QueueOperation, QUEUE_SNAPSHOT_KEY};
