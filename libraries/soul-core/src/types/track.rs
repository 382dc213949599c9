/// Track domain type
use crate::types::{ProviderId, TrackId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Addressable identity of a track: the provider that plays it plus the
/// provider's own identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackKey {
    /// Provider that owns the track
    pub provider: ProviderId,

    /// Identifier within the provider (file path, remote id, ...)
    pub provider_id: String,
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.provider_id)
    }
}

/// Audio track as resolved by the catalog
///
/// Immutable once resolved. The playback core only keeps shared references
/// and denormalized display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Catalog identifier
    pub id: TrackId,

    /// Provider that plays this track
    pub provider: ProviderId,

    /// Identifier within the provider
    pub provider_id: String,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: Option<String>,

    /// Album name
    pub album: Option<String>,

    /// Cover art location
    pub cover_art: Option<String>,

    /// Track duration in milliseconds
    pub duration_ms: Option<u64>,
}

impl Track {
    /// Create a new track with minimal metadata
    pub fn new(
        id: impl Into<String>,
        provider: ProviderId,
        provider_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: TrackId::new(id),
            provider,
            provider_id: provider_id.into(),
            title: title.into(),
            artist: None,
            album: None,
            cover_art: None,
            duration_ms: None,
        }
    }

    #[must_use]
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Identity of this track
    pub fn key(&self) -> TrackKey {
        TrackKey {
            provider: self.provider.clone(),
            provider_id: self.provider_id.clone(),
        }
    }

    /// Whether both tracks refer to the same `(provider, provider_id)`
    pub fn same_identity(&self, other: &Track) -> bool {
        self.provider == other.provider && self.provider_id == other.provider_id
    }

    /// Duration rounded to whole seconds (0 when unknown)
    pub fn duration_seconds(&self) -> u32 {
        self.duration_ms
            .map(|ms| ((ms + 500) / 1000) as u32)
            .unwrap_or(0)
    }
}
