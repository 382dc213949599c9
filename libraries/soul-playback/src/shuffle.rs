//! Shuffle algorithm for queue randomization
//!
//! Fisher-Yates over the queue entries, optionally pinning one entry
//! (the one currently playing) to the front.

use crate::queue::{QueueEntry, QueueEntryId};
use rand::seq::SliceRandom;
use rand::Rng;

/// Shuffle entries in place using the thread-local RNG
pub fn shuffle_entries(entries: &mut [QueueEntry], pinned: Option<QueueEntryId>) {
    shuffle_entries_with(entries, pinned, &mut rand::thread_rng());
}

/// Shuffle entries in place
///
/// When `pinned` names an entry in the slice it is moved to position 0
/// and only the entries behind it are permuted.
pub fn shuffle_entries_with<R: Rng + ?Sized>(
    entries: &mut [QueueEntry],
    pinned: Option<QueueEntryId>,
    rng: &mut R,
) {
    let pinned_at = pinned.and_then(|id| entries.iter().position(|e| e.id() == id));

    match pinned_at {
        Some(index) => {
            entries.swap(0, index);
            entries[1..].shuffle(rng);
        }
        None => entries.shuffle(rng),
    }
}
