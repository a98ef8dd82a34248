//! Session store trait and in-memory implementation

use std::collections::HashMap;

use parking_lot::RwLock;

/// String-keyed store scoped to the process lifetime.
///
/// Used by the offline queue for metadata snapshots; the backing
/// implementation is swappable (browser sessionStorage, desktop shell
/// key-value store) as long as it honors get/set/remove semantics.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Default in-memory implementation. Cleared on restart by construction.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}
