//! Offline queue manager
//!
//! Long-lived registry of deferred operations, keyed by item id. A single
//! drain task processes the backlog sequentially whenever the client is
//! online; each item runs through the retry executor with the queue's
//! default policy. Item metadata is snapshotted to the session store on
//! every state change for observability.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::task::JoinHandle;

use super::hooks::QueueHooks;
use super::item::{generate_item_id, AddOptions, ItemStatus, QueueItem};
use crate::net::connectivity::ConnectivityMonitor;
use crate::net::error::{NetError, QueueError};
use crate::net::retry::{with_retry, with_retry_hooks, RetryHooks, RetryPolicy};
use crate::storage::SessionStore;

/// Session store key under which queue metadata snapshots live.
pub const QUEUE_SNAPSHOT_KEY: &str = "inkpot.offline_queue.snapshot";

/// A deferred operation: async, fallible, re-invokable for retries.
///
/// Results are type-erased to JSON values so heterogeneous operations can
/// share one queue; callers that need typed results decode in their
/// completion callback.
pub type QueueOperation = Box<dyn FnMut() -> BoxFuture<'static, Result<Value, NetError>> + Send>;

/// Outcome of [`OfflineQueue::run_online_or_enqueue`].
#[derive(Debug)]
pub enum Dispatch {
    /// The client was online; the operation ran to completion inline.
    Completed(Value),
    /// The client was offline; the operation was queued under this id.
    Queued(String),
}

/// Offline queue manager.
///
/// Cheaply cloneable handle; all clones share the same queue. Construct one
/// at application startup and inject it wherever deferred execution is
/// needed - there is deliberately no global instance.
///
/// Must be constructed inside a Tokio runtime (it spawns the connectivity
/// listener task).
#[derive(Clone)]
pub struct OfflineQueue {
    inner: Arc<Inner>,
}

struct Inner {
    policy: RetryPolicy,
    hooks: QueueHooks,
    connectivity: ConnectivityMonitor,
    store: Arc<dyn SessionStore>,
    /// Metadata records, keyed by item id.
    items: RwLock<HashMap<String, QueueItem>>,
    /// Operation closures, keyed by item id. Separate from the metadata so
    /// snapshots never have to reason about non-serializable state.
    operations: Mutex<HashMap<String, QueueOperation>>,
    /// Items read back from a previous snapshot, for diagnostics only.
    /// Their closures are gone; they are never re-executed.
    recovered: Vec<QueueItem>,
    draining: AtomicBool,
    disposed: AtomicBool,
    next_seq: AtomicU64,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl OfflineQueue {
    /// Create a queue observing `connectivity`, snapshotting metadata into
    /// `store`, and retrying each item per `policy`.
    pub fn new(
        connectivity: ConnectivityMonitor,
        store: Arc<dyn SessionStore>,
        policy: RetryPolicy,
        hooks: QueueHooks,
    ) -> anyhow::Result<Self> {
        policy.validate().context("offline queue retry policy")?;

        let recovered = load_snapshot(store.as_ref());
        if !recovered.is_empty() {
            tracing::info!(
                "found {} queue item(s) from a previous session; their operations \
                 are unrecoverable and will not be replayed",
                recovered.len()
            );
        }

        let queue = Self {
            inner: Arc::new(Inner {
                policy,
                hooks,
                connectivity,
                store,
                items: RwLock::new(HashMap::new()),
                operations: Mutex::new(HashMap::new()),
                recovered,
                draining: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                next_seq: AtomicU64::new(0),
                listener: Mutex::new(None),
            }),
        };
        queue.spawn_connectivity_listener();
        Ok(queue)
    }

    /// Queue an operation. Fires `on_item_added`, persists the snapshot,
    /// and - when online - kicks off a drain without blocking the caller.
    pub fn add(&self, operation: QueueOperation, opts: AddOptions) -> Result<String, QueueError> {
        if self.inner.disposed.load(Ordering::Acquire) {
            return Err(QueueError::Disposed);
        }

        let id = opts.id.unwrap_or_else(generate_item_id);
        let item = {
            let mut items = self.inner.items.write();
            if items.contains_key(&id) {
                return Err(QueueError::DuplicateId(id));
            }
            let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
            let item = QueueItem::new(id.clone(), opts.priority, opts.metadata, seq);
            items.insert(id.clone(), item.clone());
            item
        };
        self.inner.operations.lock().insert(id.clone(), operation);
        self.persist();

        tracing::debug!("queued item {id} (priority {})", item.priority);
        if let Some(cb) = &self.inner.hooks.on_item_added {
            cb(&item);
        }

        if self.inner.connectivity.is_online() && !self.inner.draining.load(Ordering::Acquire) {
            let queue = self.clone();
            tokio::spawn(async move { queue.process_queue().await });
        }

        Ok(id)
    }

    /// Remove a pending or failed item. Returns whether anything was
    /// removed. An item currently being processed is owned by the drain
    /// loop and cannot be removed mid-flight.
    pub fn remove(&self, id: &str) -> bool {
        let removed = {
            let mut items = self.inner.items.write();
            match items.get(id) {
                Some(item) if item.status == ItemStatus::Processing => false,
                Some(_) => {
                    items.remove(id);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.inner.operations.lock().remove(id);
            self.persist();
        }
        removed
    }

    /// Empty the queue unconditionally.
    pub fn clear(&self) {
        self.inner.items.write().clear();
        self.inner.operations.lock().clear();
        self.persist();
    }

    pub fn size(&self) -> usize {
        self.inner.items.read().len()
    }

    pub fn pending_count(&self) -> usize {
        self.inner
            .items
            .read()
            .values()
            .filter(|item| item.status == ItemStatus::Pending)
            .count()
    }

    /// Read-only snapshot of the live queue, in insertion order.
    pub fn get_items(&self) -> Vec<QueueItem> {
        let mut items: Vec<QueueItem> = self.inner.items.read().values().cloned().collect();
        items.sort_by_key(|item| item.seq);
        items
    }

    pub fn is_online(&self) -> bool {
        self.inner.connectivity.is_online()
    }

    /// Items recorded by a previous session's snapshot. Diagnostics only;
    /// their operations cannot be reconstructed.
    pub fn recovered_items(&self) -> &[QueueItem] {
        &self.inner.recovered
    }

    /// Drain the backlog: process pending items one at a time, highest
    /// priority first (ties by insertion order), stopping early if
    /// connectivity drops. Idempotent - a no-op if a drain is already
    /// running or the client is offline.
    pub async fn process_queue(&self) {
        if !self.inner.connectivity.is_online() {
            return;
        }
        if self.inner.draining.swap(true, Ordering::AcqRel) {
            return;
        }
        let _drain_guard = scopeguard::guard((), |()| {
            self.inner.draining.store(false, Ordering::Release);
        });

        tracing::debug!("draining offline queue ({} pending)", self.pending_count());
        while self.inner.connectivity.is_online() {
            let Some(id) = self.next_pending_id() else {
                break;
            };
            self.process_item(&id).await;
        }

        if self.pending_count() == 0 {
            if let Some(cb) = &self.inner.hooks.on_queue_empty {
                cb();
            }
        }
    }

    /// Detach the connectivity listener and empty the queue. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = self.inner.listener.lock().take() {
            handle.abort();
        }
        self.clear();
        tracing::debug!("offline queue disposed");
    }

    /// Run `operation` immediately (with retries) when online, or queue it
    /// for later when offline. Callers branch on the returned [`Dispatch`].
    pub async fn run_online_or_enqueue(
        &self,
        mut operation: QueueOperation,
        opts: AddOptions,
    ) -> Result<Dispatch, QueueError> {
        if self.inner.connectivity.is_online() {
            let value = with_retry("online dispatch", &self.inner.policy, || operation()).await?;
            Ok(Dispatch::Completed(value))
        } else {
            let id = self.add(operation, opts)?;
            Ok(Dispatch::Queued(id))
        }
    }

    fn spawn_connectivity_listener(&self) {
        let mut rx = self.inner.connectivity.subscribe();
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                if !*rx.borrow_and_update() {
                    continue;
                }
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let queue = OfflineQueue { inner };
                tracing::info!("back online, resuming offline queue");
                if let Some(cb) = &queue.inner.hooks.on_online_resume {
                    cb();
                }
                queue.process_queue().await;
            }
        });
        *self.inner.listener.lock() = Some(handle);
    }

    /// Highest-priority pending item, insertion order breaking ties.
    fn next_pending_id(&self) -> Option<String> {
        let items = self.inner.items.read();
        items
            .values()
            .filter(|item| item.status == ItemStatus::Pending)
            .max_by(|a, b| a.priority.cmp(&b.priority).then(b.seq.cmp(&a.seq)))
            .map(|item| item.id.clone())
    }

    async fn process_item(&self, id: &str) {
        let operation = self.inner.operations.lock().remove(id);
        let Some(operation) = operation else {
            // Metadata without a closure: either recovered from a snapshot
            // or mutated out from under us. Surface as failed.
            self.update_item(id, |item| {
                item.status = ItemStatus::Failed;
                item.last_error = Some("operation closure missing".to_string());
            });
            self.persist();
            return;
        };

        self.update_item(id, |item| {
            item.status = ItemStatus::Processing;
            item.last_attempt_at = Some(Utc::now());
        });
        self.persist();

        let on_retry = |attempt: u32, _delay: Duration, err: &NetError| {
            self.update_item(id, |item| {
                item.retry_count = attempt;
                item.last_error = Some(err.to_string());
            });
            self.persist();
        };
        let hooks = RetryHooks {
            on_retry: Some(&on_retry),
            ..RetryHooks::default()
        };

        match with_retry_hooks("offline queue item", &self.inner.policy, operation, hooks).await {
            Ok(value) => {
                self.update_item(id, |item| {
                    item.status = ItemStatus::Completed;
                    item.result = Some(value.clone());
                });
                self.persist();
                if let Some(item) = self.snapshot_item(id) {
                    if let Some(cb) = &self.inner.hooks.on_item_completed {
                        cb(&item, &value);
                    }
                }
                self.inner.items.write().remove(id);
                self.persist();
                tracing::debug!("queue item {id} completed");
            }
            Err(err) => {
                self.update_item(id, |item| {
                    item.status = ItemStatus::Failed;
                    item.last_error = Some(err.to_string());
                });
                self.persist();
                tracing::warn!("queue item {id} failed: {err}");
                if let Some(item) = self.snapshot_item(id) {
                    if let Some(cb) = &self.inner.hooks.on_item_failed {
                        cb(&item, &err);
                    }
                }
            }
        }
    }

    /// Mutate an item in place. Silently skips items that vanished
    /// (removed or cleared mid-flight).
    fn update_item(&self, id: &str, mutate: impl FnOnce(&mut QueueItem)) {
        if let Some(item) = self.inner.items.write().get_mut(id) {
            mutate(item);
        }
    }

    fn snapshot_item(&self, id: &str) -> Option<QueueItem> {
        self.inner.items.read().get(id).cloned()
    }

    /// Snapshot every item's metadata to the session store.
    fn persist(&self) {
        let snapshot = self.get_items();
        match serde_json::to_string(&snapshot) {
            Ok(json) => self.inner.store.set(QUEUE_SNAPSHOT_KEY, &json),
            Err(err) => tracing::warn!("failed to serialize queue snapshot: {err}"),
        }
    }
}

fn load_snapshot(store: &dyn SessionStore) -> Vec<QueueItem> {
    let Some(json) = store.get(QUEUE_SNAPSHOT_KEY) else {
        return Vec::new();
    };
    match serde_json::from_str(&json) {
        Ok(items) => items,
        Err(err) => {
            tracing::warn!("discarding unreadable queue snapshot: {err}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use serde_json::json;

    use super::*;
    use crate::storage::MemorySessionStore;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            backoff_factor: 2.0,
            jitter: false,
        }
    }

    fn test_queue(online: bool, hooks: QueueHooks) -> (OfflineQueue, ConnectivityMonitor) {
        let monitor = ConnectivityMonitor::new(online);
        let store = Arc::new(MemorySessionStore::new());
        let queue = OfflineQueue::new(monitor.clone(), store, fast_policy(), hooks).unwrap();
        (queue, monitor)
    }

    fn recording_op(log: Arc<Mutex<Vec<String>>>, tag: &'static str) -> QueueOperation {
        Box::new(move || {
            let log = Arc::clone(&log);
            Box::pin(async move {
                log.lock().push(tag.to_string());
                Ok(Value::String(tag.to_string()))
            })
        })
    }

    fn failing_op(status: u16) -> QueueOperation {
        Box::new(move || {
            Box::pin(async move {
                Err(NetError::Http {
                    status,
                    message: "boom".to_string(),
                })
            })
        })
    }

    /// Sleep-based wait so the paused clock can auto-advance while spawned
    /// drain tasks make progress.
    async fn settle_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..10_000 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("settle_until timed out waiting for condition");
    }

    #[tokio::test(start_paused = true)]
    async fn drains_in_priority_order_on_reconnect() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let resumed = Arc::new(AtomicBool::new(false));
        let emptied = Arc::new(AtomicBool::new(false));

        let hooks = QueueHooks {
            on_online_resume: Some(Box::new({
                let resumed = Arc::clone(&resumed);
                move || resumed.store(true, Ordering::SeqCst)
            })),
            on_queue_empty: Some(Box::new({
                let emptied = Arc::clone(&emptied);
                move || emptied.store(true, Ordering::SeqCst)
            })),
            ..QueueHooks::default()
        };
        let (queue, monitor) = test_queue(false, hooks);

        for (tag, priority) in [("low", 1), ("high", 5), ("mid", 3)] {
            queue
                .add(
                    recording_op(Arc::clone(&log), tag),
                    AddOptions {
                        priority,
                        ..AddOptions::default()
                    },
                )
                .unwrap();
        }
        assert_eq!(queue.pending_count(), 3);
        assert!(log.lock().is_empty());

        monitor.set_online(true);
        settle_until(|| queue.size() == 0).await;

        assert_eq!(*log.lock(), vec!["high", "mid", "low"]);
        assert!(resumed.load(Ordering::SeqCst));
        assert!(emptied.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn offline_add_leaves_item_pending() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let added = Arc::new(AtomicBool::new(false));
        let hooks = QueueHooks {
            on_item_added: Some(Box::new({
                let added = Arc::clone(&added);
                move |_item: &QueueItem| added.store(true, Ordering::SeqCst)
            })),
            ..QueueHooks::default()
        };
        let (queue, _monitor) = test_queue(false, hooks);

        queue
            .add(recording_op(Arc::clone(&log), "deferred"), AddOptions::default())
            .unwrap();

        for _ in 0..10 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(log.lock().is_empty());
        assert!(added.load(Ordering::SeqCst));
        let items = queue.get_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].status, ItemStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn online_add_processes_and_removes_completed_items() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let completed = Arc::new(Mutex::new(Vec::new()));
        let hooks = QueueHooks {
            on_item_completed: Some(Box::new({
                let completed = Arc::clone(&completed);
                move |item: &QueueItem, value: &Value| {
                    completed.lock().push((item.clone(), value.clone()));
                }
            })),
            ..QueueHooks::default()
        };
        let (queue, _monitor) = test_queue(true, hooks);

        queue
            .add(recording_op(Arc::clone(&log), "draft"), AddOptions::default())
            .unwrap();
        settle_until(|| queue.size() == 0).await;

        assert_eq!(*log.lock(), vec!["draft"]);
        let completed = completed.lock();
        assert_eq!(completed.len(), 1);
        let (item, value) = &completed[0];
        assert_eq!(item.status, ItemStatus::Completed);
        assert_eq!(value, &Value::String("draft".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn drain_is_strictly_sequential() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let slow_op = |tag: &'static str, log: Arc<Mutex<Vec<String>>>| -> QueueOperation {
            Box::new(move || {
                let log = Arc::clone(&log);
                Box::pin(async move {
                    log.lock().push(format!("{tag}-start"));
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    log.lock().push(format!("{tag}-end"));
                    Ok(Value::Null)
                })
            })
        };
        let (queue, monitor) = test_queue(false, QueueHooks::default());

        queue
            .add(slow_op("a", Arc::clone(&log)), AddOptions::default())
            .unwrap();
        queue
            .add(slow_op("b", Arc::clone(&log)), AddOptions::default())
            .unwrap();

        monitor.set_online(true);
        settle_until(|| queue.size() == 0).await;

        assert_eq!(*log.lock(), vec!["a-start", "a-end", "b-start", "b-end"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_item_stays_with_error_details() {
        let failed = Arc::new(Mutex::new(Vec::new()));
        let hooks = QueueHooks {
            on_item_failed: Some(Box::new({
                let failed = Arc::clone(&failed);
                move |item: &QueueItem, err: &NetError| {
                    failed.lock().push((item.clone(), err.clone()));
                }
            })),
            ..QueueHooks::default()
        };
        let (queue, _monitor) = test_queue(true, hooks);

        let id = queue.add(failing_op(500), AddOptions::default()).unwrap();
        settle_until(|| {
            queue
                .get_items()
                .first()
                .is_some_and(|item| item.status == ItemStatus::Failed)
        })
        .await;

        let items = queue.get_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, id);
        assert_eq!(items[0].status, ItemStatus::Failed);
        // Two retries on top of the first attempt, then exhaustion.
        assert_eq!(items[0].retry_count, 2);
        assert!(items[0].last_error.as_deref().unwrap().contains("http 500"));

        let failed = failed.lock();
        assert_eq!(failed.len(), 1);
        assert!(matches!(failed[0].1, NetError::Http { status: 500, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_progress_is_recorded_on_the_item() {
        let completed = Arc::new(Mutex::new(Vec::new()));
        let hooks = QueueHooks {
            on_item_completed: Some(Box::new({
                let completed = Arc::clone(&completed);
                move |item: &QueueItem, _value: &Value| completed.lock().push(item.clone())
            })),
            ..QueueHooks::default()
        };
        let (queue, _monitor) = test_queue(true, hooks);

        let calls = Arc::new(AtomicU32::new(0));
        let flaky: QueueOperation = Box::new({
            let calls = Arc::clone(&calls);
            move || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move {
                    if n == 0 {
                        Err(NetError::Http {
                            status: 503,
                            message: "overloaded".to_string(),
                        })
                    } else {
                        Ok(json!({"chapter": 3}))
                    }
                })
            }
        });

        queue.add(flaky, AddOptions::default()).unwrap();
        settle_until(|| queue.size() == 0).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let completed = completed.lock();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].retry_count, 1);
        assert!(completed[0].last_error.as_deref().unwrap().contains("503"));
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_ids_are_rejected() {
        let (queue, _monitor) = test_queue(false, QueueHooks::default());
        let log = Arc::new(Mutex::new(Vec::new()));

        let opts = || AddOptions {
            id: Some("chapter-sync".to_string()),
            ..AddOptions::default()
        };
        queue
            .add(recording_op(Arc::clone(&log), "first"), opts())
            .unwrap();
        let err = queue
            .add(recording_op(Arc::clone(&log), "second"), opts())
            .unwrap_err();

        assert!(matches!(err, QueueError::DuplicateId(id) if id == "chapter-sync"));
        assert_eq!(queue.size(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn remove_covers_pending_and_missing_items() {
        let (queue, _monitor) = test_queue(false, QueueHooks::default());
        let log = Arc::new(Mutex::new(Vec::new()));

        let id = queue
            .add(recording_op(Arc::clone(&log), "x"), AddOptions::default())
            .unwrap();
        assert!(queue.remove(&id));
        assert!(!queue.remove(&id));
        assert_eq!(queue.size(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshots_persist_metadata_and_recover_for_diagnostics() {
        let monitor = ConnectivityMonitor::new(false);
        let store = Arc::new(MemorySessionStore::new());
        let queue = OfflineQueue::new(
            monitor.clone(),
            Arc::clone(&store) as Arc<dyn SessionStore>,
            fast_policy(),
            QueueHooks::default(),
        )
        .unwrap();

        let log = Arc::new(Mutex::new(Vec::new()));
        let id = queue
            .add(
                recording_op(Arc::clone(&log), "synopsis"),
                AddOptions {
                    priority: 2,
                    metadata: Some(json!({"step": "synopsis"})),
                    ..AddOptions::default()
                },
            )
            .unwrap();

        let json = store.get(QUEUE_SNAPSHOT_KEY).unwrap();
        assert!(json.contains(&id));
        assert!(json.contains("synopsis"));

        // A fresh manager over the same store sees the leftovers as
        // diagnostics, not as runnable work.
        let revived = OfflineQueue::new(
            monitor,
            Arc::clone(&store) as Arc<dyn SessionStore>,
            fast_policy(),
            QueueHooks::default(),
        )
        .unwrap();
        assert_eq!(revived.size(), 0);
        assert_eq!(revived.recovered_items().len(), 1);
        assert_eq!(revived.recovered_items()[0].id, id);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_items_leave_an_empty_snapshot() {
        let monitor = ConnectivityMonitor::new(true);
        let store = Arc::new(MemorySessionStore::new());
        let queue = OfflineQueue::new(
            monitor,
            Arc::clone(&store) as Arc<dyn SessionStore>,
            fast_policy(),
            QueueHooks::default(),
        )
        .unwrap();

        let log = Arc::new(Mutex::new(Vec::new()));
        queue
            .add(recording_op(Arc::clone(&log), "done"), AddOptions::default())
            .unwrap();
        settle_until(|| queue.size() == 0).await;

        assert_eq!(store.get(QUEUE_SNAPSHOT_KEY).unwrap(), "[]");
    }

    #[tokio::test(start_paused = true)]
    async fn run_online_or_enqueue_branches_on_connectivity() {
        let (queue, monitor) = test_queue(true, QueueHooks::default());
        let log = Arc::new(Mutex::new(Vec::new()));

        let outcome = queue
            .run_online_or_enqueue(recording_op(Arc::clone(&log), "now"), AddOptions::default())
            .await
            .unwrap();
        assert!(matches!(outcome, Dispatch::Completed(Value::String(s)) if s == "now"));
        assert_eq!(queue.size(), 0);

        monitor.set_online(false);
        let outcome = queue
            .run_online_or_enqueue(recording_op(Arc::clone(&log), "later"), AddOptions::default())
            .await
            .unwrap();
        let Dispatch::Queued(id) = outcome else {
            panic!("expected the offline branch to queue");
        };
        assert_eq!(queue.get_items()[0].id, id);
        assert_eq!(*log.lock(), vec!["now"]);
    }

    #[tokio::test(start_paused = true)]
    async fn connectivity_loss_stops_the_drain_between_items() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let emptied = Arc::new(AtomicBool::new(false));
        let hooks = QueueHooks {
            on_queue_empty: Some(Box::new({
                let emptied = Arc::clone(&emptied);
                move || emptied.store(true, Ordering::SeqCst)
            })),
            ..QueueHooks::default()
        };
        let monitor = ConnectivityMonitor::new(false);
        let store = Arc::new(MemorySessionStore::new());
        let queue =
            OfflineQueue::new(monitor.clone(), store, fast_policy(), hooks).unwrap();

        // First item drops the connection as a side effect of running.
        let dropper: QueueOperation = Box::new({
            let monitor = monitor.clone();
            let log = Arc::clone(&log);
            move || {
                let monitor = monitor.clone();
                let log = Arc::clone(&log);
                Box::pin(async move {
                    log.lock().push("dropper".to_string());
                    monitor.set_online(false);
                    Ok(Value::Null)
                })
            }
        });
        queue
            .add(
                dropper,
                AddOptions {
                    priority: 10,
                    ..AddOptions::default()
                },
            )
            .unwrap();
        queue
            .add(recording_op(Arc::clone(&log), "stranded"), AddOptions::default())
            .unwrap();

        monitor.set_online(true);
        settle_until(|| queue.size() == 1).await;

        assert_eq!(*log.lock(), vec!["dropper"]);
        assert_eq!(queue.get_items()[0].status, ItemStatus::Pending);
        assert!(!emptied.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_is_idempotent_and_blocks_further_adds() {
        let resumed = Arc::new(AtomicBool::new(false));
        let hooks = QueueHooks {
            on_online_resume: Some(Box::new({
                let resumed = Arc::clone(&resumed);
                move || resumed.store(true, Ordering::SeqCst)
            })),
            ..QueueHooks::default()
        };
        let (queue, monitor) = test_queue(false, hooks);
        let log = Arc::new(Mutex::new(Vec::new()));

        queue
            .add(recording_op(Arc::clone(&log), "doomed"), AddOptions::default())
            .unwrap();
        queue.dispose();
        queue.dispose();

        assert_eq!(queue.size(), 0);
        let err = queue
            .add(recording_op(Arc::clone(&log), "late"), AddOptions::default())
            .unwrap_err();
        assert!(matches!(err, QueueError::Disposed));

        // The listener is gone: coming back online resumes nothing.
        monitor.set_online(true);
        for _ in 0..10 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(!resumed.load(Ordering::SeqCst));
        assert!(log.lock().is_empty());
    }
}
