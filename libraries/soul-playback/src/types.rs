//! Core types for playback management

use crate::queue::QueueEntryId;
use serde::{Deserialize, Serialize};
use soul_core::TrackKey;
use std::fmt;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No entry loaded
    #[default]
    Stopped,

    /// Backend is buffering the current entry
    Loading,

    /// Currently playing
    Playing,

    /// Paused mid-track (also the state of a freshly loaded entry)
    Paused,
}

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    /// Stop when the queue ends
    #[default]
    Off,

    /// Loop the current track
    Track,

    /// Loop the entire queue
    Queue,
}

impl RepeatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Track => "track",
            Self::Queue => "queue",
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations a playback instance exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapabilityOperation {
    Play,
    Seek,
    Pause,
    Resume,
    Stop,
    ChangeVolume,
    Mute,
    Unmute,
}

impl fmt::Display for CapabilityOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Play => "play",
            Self::Seek => "seek",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::ChangeVolume => "change_volume",
            Self::Mute => "mute",
            Self::Unmute => "unmute",
        };
        f.write_str(name)
    }
}

/// User-visible problem with the current session
///
/// Cleared by the next successful load or play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackFault {
    /// The instance declined or failed an operation
    CapabilityFailed {
        operation: CapabilityOperation,
        message: Option<String>,
    },

    /// The provider could not create an instance for a track
    InstanceUnavailable { track: TrackKey, message: String },

    /// The backend stayed in its loading state past the configured timeout
    LoadingTimedOut { entry: QueueEntryId },
}

impl fmt::Display for PlaybackFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapabilityFailed {
                operation,
                message: Some(message),
            } => write!(f, "{} failed: {}", operation, message),
            Self::CapabilityFailed {
                operation,
                message: None,
            } => write!(f, "{} was declined by the backend", operation),
            Self::InstanceUnavailable { track, message } => {
                write!(f, "cannot play {}: {}", track, message)
            }
            Self::LoadingTimedOut { entry } => write!(f, "entry {} never finished loading", entry),
        }
    }
}
