/// In-memory key/value store
use async_trait::async_trait;
use soul_core::KeyValueStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Volatile key/value store
///
/// Used by tests and by hosts that do not want session persistence on disk.
/// Counts writes so callers can observe write coalescing.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    writes: AtomicUsize,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls served so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn save(&self, key: &str, blob: &[u8]) -> soul_core::Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), blob.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self, key: &str) -> soul_core::Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> soul_core::Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }
}
