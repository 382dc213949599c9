//! Playback commands
//!
//! One closed enum for everything a UI (or remote control) can ask of the
//! orchestrator, so commands can cross channels and be logged uniformly.

use crate::error::Result;
use crate::orchestrator::PlaybackOrchestrator;
use crate::queue::QueueEntryId;
use crate::types::RepeatMode;
use soul_core::{Track, TrackListId};
use tracing::trace;

/// Command for the playback orchestrator
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackCommand {
    PlayTrack(Track),
    PlayTracks {
        tracks: Vec<Track>,
        track_list: Option<TrackListId>,
    },
    PlayEntry(QueueEntryId),
    Pause,
    Resume,
    Stop,
    /// Seek to a position in seconds
    Seek(u32),
    Next,
    Previous,
    SetVolume(u8),
    Mute,
    Unmute,
    ToggleMute,
    SetShuffle(bool),
    ToggleShuffle,
    SetRepeat(RepeatMode),
    Enqueue {
        tracks: Vec<Track>,
        track_list: Option<TrackListId>,
    },
    EnqueueNext {
        tracks: Vec<Track>,
        track_list: Option<TrackListId>,
    },
    RemoveEntry(QueueEntryId),
    MoveEntry {
        entry: QueueEntryId,
        to: usize,
    },
    ClearQueue,
}

impl PlaybackCommand {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlayTrack(_) => "play_track",
            Self::PlayTracks { .. } => "play_tracks",
            Self::PlayEntry(_) => "play_entry",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Seek(_) => "seek",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::SetVolume(_) => "set_volume",
            Self::Mute => "mute",
            Self::Unmute => "unmute",
            Self::ToggleMute => "toggle_mute",
            Self::SetShuffle(_) => "set_shuffle",
            Self::ToggleShuffle => "toggle_shuffle",
            Self::SetRepeat(_) => "set_repeat",
            Self::Enqueue { .. } => "enqueue",
            Self::EnqueueNext { .. } => "enqueue_next",
            Self::RemoveEntry(_) => "remove_entry",
            Self::MoveEntry { .. } => "move_entry",
            Self::ClearQueue => "clear_queue",
        }
    }
}

impl PlaybackOrchestrator {
    /// Execute a command
    ///
    /// Notifications queued before the command are applied first, so the
    /// command's own outcome is what observers end up seeing. Returns
    /// whether a transition was committed.
    pub async fn dispatch(&mut self, command: PlaybackCommand) -> Result<bool> {
        self.drain_notifications();
        trace!("Dispatching {}", command.name());

        match command {
            PlaybackCommand::PlayTrack(track) => self.play_track(track).await,
            PlaybackCommand::PlayTracks { tracks, track_list } => {
                self.play_tracks(tracks, track_list).await
            }
            PlaybackCommand::PlayEntry(entry) => self.play_entry(entry).await,
            PlaybackCommand::Pause => self.pause().await,
            PlaybackCommand::Resume => self.resume().await,
            PlaybackCommand::Stop => self.stop().await,
            PlaybackCommand::Seek(position) => self.seek(position).await,
            PlaybackCommand::Next => self.play_next().await,
            PlaybackCommand::Previous => self.play_previous().await,
            PlaybackCommand::SetVolume(value) => self.change_volume(value).await,
            PlaybackCommand::Mute => self.mute().await,
            PlaybackCommand::Unmute => self.unmute().await,
            PlaybackCommand::ToggleMute => self.toggle_mute().await,
            PlaybackCommand::SetShuffle(enabled) => Ok(self.set_shuffle(enabled)),
            PlaybackCommand::ToggleShuffle => Ok(self.toggle_shuffle()),
            PlaybackCommand::SetRepeat(mode) => Ok(self.set_repeat(mode)),
            PlaybackCommand::Enqueue { tracks, track_list } => {
                Ok(!self.enqueue(tracks, track_list).is_empty())
            }
            PlaybackCommand::EnqueueNext { tracks, track_list } => {
                Ok(!self.enqueue_next(tracks, track_list).is_empty())
            }
            PlaybackCommand::RemoveEntry(entry) => self.remove_entry(entry).await,
            PlaybackCommand::MoveEntry { entry, to } => self.move_entry(entry, to),
            PlaybackCommand::ClearQueue => self.clear_queue().await,
        }
    }
}
