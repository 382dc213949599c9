//! Catalog collaborator
//!
//! Resolves persisted track identities back to full metadata. The catalog
//! lives behind an opaque transport (IPC, HTTP, local database); the
//! playback core only needs this single lookup.

use crate::error::Result;
use crate::types::{ProviderId, Track};
use async_trait::async_trait;

/// Track catalog providing identity → metadata resolution
#[async_trait]
pub trait TrackCatalog: Send + Sync {
    /// Resolve a track by provider identity
    ///
    /// Returns `Ok(None)` when the catalog no longer knows the track.
    /// `Err` is reserved for transport/storage failures.
    async fn resolve_track(&self, provider: &ProviderId, provider_id: &str)
        -> Result<Option<Track>>;
}
