use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory key-value map shared by every request handler.
///
/// Readers (`get`, `exists`) take the shared lock and run concurrently;
/// writers (`put`, `delete`) take the exclusive lock. The lock is held only
/// for the map lookup or mutation itself, never across I/O.
#[derive(Debug, Default)]
pub struct KvStore {
    data: RwLock<HashMap<String, String>>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`, or `None` when the key is absent.
    pub fn get(&self, key: &str) -> Option<String> {
        self.data.read().get(key).cloned()
    }

    /// Stores `value` under `key`, overwriting any previous value.
    ///
    /// Size limits are enforced by the HTTP layer before this is called.
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        tracing::debug!("PUT: key={} ({} bytes)", key, value.len());
        self.data.write().insert(key, value);
    }

    /// Removes `key`. Deleting an absent key is a no-op.
    ///
    /// Returns `true` if a value was actually removed.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.data.write().remove(key).is_some();
        tracing::debug!("DELETE: key={} removed={}", key, removed);
        removed
    }

    pub fn exists(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}
