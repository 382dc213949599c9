//! Error types for playback management

use crate::queue::QueueEntryId;
use soul_core::{ProviderId, SoulError};
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// No provider registered for the track's provider identifier
    #[error("Unknown playback provider: {0}")]
    UnknownProvider(ProviderId),

    /// Backend-reported failure
    #[error("Playback backend error: {0}")]
    Backend(String),

    /// Queue is empty
    #[error("Queue is empty")]
    QueueEmpty,

    /// Queue entry does not exist
    #[error("Queue entry not found: {0}")]
    EntryNotFound(QueueEntryId),

    /// Index out of bounds
    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// Persisted session failed structural validation
    #[error("Invalid persisted state: {0}")]
    InvalidPersistedState(String),

    /// A command found the session in a state its preconditions rule out
    #[error("Playback invariant violated: {0}")]
    Invariant(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The controller task is no longer running
    #[error("Playback controller is closed")]
    ControllerClosed,

    /// Collaborator (catalog, storage) error
    #[error(transparent)]
    Core(#[from] SoulError),

    /// Serialization error
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl PlaybackError {
    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
