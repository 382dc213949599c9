//! Committed session state and its observable snapshot

use crate::queue::{QueueEntry, QueueEntryId};
use crate::types::{PlaybackFault, PlaybackState, RepeatMode};
use crate::volume::VolumeState;
use soul_core::{Track, TrackListId};
use std::sync::Arc;
use tokio::sync::watch;

/// Live playback session
///
/// `current_entry` is `None` exactly when the state is `Stopped`, and
/// `progress_seconds` is `None` exactly while `Loading`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub state: PlaybackState,
    pub current_entry: Option<QueueEntryId>,

    /// Collection playback was started from
    pub current_track_list: Option<TrackListId>,

    /// Rounded position of the current entry
    pub progress_seconds: Option<u32>,

    pub volume: VolumeState,
    pub shuffle_enabled: bool,
    pub repeat_mode: RepeatMode,

    /// Last failure shown to the user
    pub fault: Option<PlaybackFault>,
}

impl PlaybackSession {
    pub fn new(volume: VolumeState) -> Self {
        Self {
            state: PlaybackState::Stopped,
            current_entry: None,
            current_track_list: None,
            progress_seconds: Some(0),
            volume,
            shuffle_enabled: false,
            repeat_mode: RepeatMode::Off,
            fault: None,
        }
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new(VolumeState::default())
    }
}

/// Immutable view of the session and queue published after every commit
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackSnapshot {
    pub session: PlaybackSession,
    pub queue: Vec<QueueEntry>,
}

impl PlaybackSnapshot {
    pub fn current_entry(&self) -> Option<&QueueEntry> {
        let id = self.session.current_entry?;
        self.queue.iter().find(|e| e.id() == id)
    }

    pub fn current_track(&self) -> Option<&Arc<Track>> {
        self.current_entry().map(|e| e.track())
    }

    /// Whether `list` is the collection currently playing
    pub fn is_playing_list(&self, list: &TrackListId) -> bool {
        self.session.state == PlaybackState::Playing
            && self.session.current_track_list.as_ref() == Some(list)
    }
}

/// Observable store for committed snapshots
///
/// Owned by the orchestrator; UI layers hold receivers.
#[derive(Debug)]
pub struct SessionStore {
    tx: watch::Sender<PlaybackSnapshot>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(PlaybackSnapshot::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.tx.subscribe()
    }

    /// Latest published snapshot
    pub fn current(&self) -> PlaybackSnapshot {
        self.tx.borrow().clone()
    }

    /// Publish a snapshot, notifying receivers only if it changed
    ///
    /// Returns whether receivers were notified.
    pub fn publish(&self, snapshot: PlaybackSnapshot) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        })
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
