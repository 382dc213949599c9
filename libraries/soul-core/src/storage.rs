//! Durable key/value storage collaborator
//!
//! The persistence protocol is agnostic to the storage medium; any backend
//! that can save and load opaque blobs by key satisfies it.

use crate::error::Result;
use async_trait::async_trait;

/// Opaque key/value durable store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Save a blob under `key`, replacing any previous value
    async fn save(&self, key: &str, blob: &[u8]) -> Result<()>;

    /// Load the blob stored under `key`
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Remove the blob stored under `key`, returning whether it existed
    async fn remove(&self, key: &str) -> Result<bool>;
}
