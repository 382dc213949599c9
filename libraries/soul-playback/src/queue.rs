//! Playback queue
//!
//! A flat, ordered list of entries whose vector order is the play order,
//! shuffled or not. Each entry remembers when it arrived so the original
//! order can be restored when shuffle is turned off.
//!
//! ```text
//! position  entry  insertion_index  track
//! 0         #4     1                B        <- shuffled: current pinned first
//! 1         #6     3                D
//! 2         #3     0                A
//! 3         #5     2                C
//! ```

use crate::error::{PlaybackError, Result};
use crate::shuffle::shuffle_entries;
use serde::{Deserialize, Serialize};
use soul_core::{Track, TrackListId};
use std::fmt;
use std::sync::Arc;

/// Queue entry identifier
///
/// Unique per insertion: adding the same track twice yields two ids, and
/// ids are never handed out again for the lifetime of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueEntryId(u64);

impl QueueEntryId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for QueueEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One occurrence of a track in the queue
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    id: QueueEntryId,
    insertion_index: u64,
    tracklist_id: Option<TrackListId>,
    track: Arc<Track>,
}

impl QueueEntry {
    /// Rebuild an entry from persisted identities
    ///
    /// Only [`Queue::install_restored`] accepts these, which keeps the
    /// queue's counters ahead of every restored id.
    pub fn restored(
        id: QueueEntryId,
        insertion_index: u64,
        tracklist_id: Option<TrackListId>,
        track: Arc<Track>,
    ) -> Self {
        Self {
            id,
            insertion_index,
            tracklist_id,
            track,
        }
    }

    pub fn id(&self) -> QueueEntryId {
        self.id
    }

    /// Arrival order, independent of the current position
    pub fn insertion_index(&self) -> u64 {
        self.insertion_index
    }

    /// Collection the entry was enqueued from
    pub fn tracklist_id(&self) -> Option<&TrackListId> {
        self.tracklist_id.as_ref()
    }

    pub fn track(&self) -> &Arc<Track> {
        &self.track
    }
}

/// Ordered playback queue
#[derive(Debug, Clone, Default)]
pub struct Queue {
    entries: Vec<QueueEntry>,

    /// Next entry id to hand out (never reset)
    next_entry_id: u64,

    /// Next arrival counter value (never reset)
    next_insertion_index: u64,
}

impl Queue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    fn mint(&mut self, track: Arc<Track>, tracklist_id: Option<TrackListId>) -> QueueEntry {
        let entry = QueueEntry {
            id: QueueEntryId(self.next_entry_id),
            insertion_index: self.next_insertion_index,
            tracklist_id,
            track,
        };
        self.next_entry_id += 1;
        self.next_insertion_index += 1;
        entry
    }

    fn mint_all(
        &mut self,
        tracks: Vec<Arc<Track>>,
        tracklist_id: Option<TrackListId>,
    ) -> Vec<QueueEntry> {
        tracks
            .into_iter()
            .map(|track| self.mint(track, tracklist_id.clone()))
            .collect()
    }

    /// Replace the whole queue
    ///
    /// Counters keep counting, so none of the old ids come back.
    pub fn replace(
        &mut self,
        tracks: Vec<Arc<Track>>,
        tracklist_id: Option<TrackListId>,
    ) -> Vec<QueueEntryId> {
        self.entries.clear();
        self.append(tracks, tracklist_id)
    }

    /// Append tracks to the end of the queue
    pub fn append(
        &mut self,
        tracks: Vec<Arc<Track>>,
        tracklist_id: Option<TrackListId>,
    ) -> Vec<QueueEntryId> {
        let entries = self.mint_all(tracks, tracklist_id);
        let ids = entries.iter().map(|e| e.id).collect();
        self.entries.extend(entries);
        ids
    }

    /// Insert tracks right after `anchor` (play next)
    ///
    /// Falls back to appending when there is no anchor or it is not queued.
    pub fn insert_after(
        &mut self,
        anchor: Option<QueueEntryId>,
        tracks: Vec<Arc<Track>>,
        tracklist_id: Option<TrackListId>,
    ) -> Vec<QueueEntryId> {
        let Some(position) = anchor.and_then(|id| self.position_of(id)) else {
            return self.append(tracks, tracklist_id);
        };

        let entries = self.mint_all(tracks, tracklist_id);
        let ids = entries.iter().map(|e| e.id).collect();
        let at = position + 1;
        self.entries.splice(at..at, entries);
        ids
    }

    /// Remove an entry, returning it if it was queued
    pub fn remove(&mut self, id: QueueEntryId) -> Option<QueueEntry> {
        let position = self.position_of(id)?;
        Some(self.entries.remove(position))
    }

    /// Move an entry to a new position (drag reorder)
    pub fn move_entry(&mut self, id: QueueEntryId, to: usize) -> Result<()> {
        let from = self.position_of(id).ok_or(PlaybackError::EntryNotFound(id))?;
        if to >= self.entries.len() {
            return Err(PlaybackError::IndexOutOfBounds(to));
        }

        if from != to {
            let entry = self.entries.remove(from);
            self.entries.insert(to, entry);
        }
        Ok(())
    }

    /// Remove every entry (counters are kept)
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: QueueEntryId) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn position_of(&self, id: QueueEntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn entry_at(&self, position: usize) -> Option<&QueueEntry> {
        self.entries.get(position)
    }

    /// Entry after `id` in play order
    pub fn next_after(&self, id: QueueEntryId) -> Option<QueueEntryId> {
        let position = self.position_of(id)?;
        self.entries.get(position + 1).map(|e| e.id)
    }

    /// Entry before `id` in play order
    pub fn previous_before(&self, id: QueueEntryId) -> Option<QueueEntryId> {
        let position = self.position_of(id)?;
        position
            .checked_sub(1)
            .and_then(|p| self.entries.get(p))
            .map(|e| e.id)
    }

    pub fn first(&self) -> Option<QueueEntryId> {
        self.entries.first().map(|e| e.id)
    }

    /// Most recently added entry
    pub fn last_inserted(&self) -> Option<&QueueEntry> {
        self.entries.iter().max_by_key(|e| e.insertion_index)
    }

    /// Shuffle the queue, keeping `current` (if queued) at the front
    pub fn shuffle_keeping(&mut self, current: Option<QueueEntryId>) {
        shuffle_entries(&mut self.entries, current);
    }

    /// Put entries back in arrival order
    pub fn restore_insertion_order(&mut self) {
        self.entries.sort_by_key(|e| e.insertion_index);
    }

    /// Install entries rebuilt from a persisted session
    ///
    /// Entry ids and insertion indices are kept verbatim; both counters move
    /// past the largest restored value so fresh entries never collide.
    pub fn install_restored(&mut self, entries: Vec<QueueEntry>) {
        if let Some(max_id) = entries.iter().map(|e| e.id.0).max() {
            self.next_entry_id = self.next_entry_id.max(max_id + 1);
        }
        if let Some(max_index) = entries.iter().map(|e| e.insertion_index).max() {
            self.next_insertion_index = self.next_insertion_index.max(max_index + 1);
        }
        self.entries = entries;
    }
}
