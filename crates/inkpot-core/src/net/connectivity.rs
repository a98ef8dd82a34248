//! Connectivity signal
//!
//! A level-triggered online/offline flag with change notification. Platform
//! glue is the producer: the browser build forwards `online`/`offline`
//! events, the desktop shell forwards reachability probes. Consumers (the
//! offline queue) read the current level or subscribe for transitions.

use std::sync::Arc;

use tokio::sync::watch;

/// Shared handle to the client's connectivity state.
///
/// Cloning is cheap; all clones observe the same flag.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    /// Create a monitor seeded with the platform's current connectivity.
    pub fn new(initial_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initial_online);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Record a connectivity change. Subscribers are only notified on actual
    /// transitions; repeating the current state is silent.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!(
                "connectivity changed: {}",
                if online { "online" } else { "offline" }
            );
        }
    }

    /// Subscribe to transitions. The receiver starts already caught up with
    /// the current state.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
