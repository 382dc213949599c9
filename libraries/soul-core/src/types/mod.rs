mod ids;
mod track;

pub use ids::{ProviderId, TrackId, TrackListId};
pub use track::{Track, TrackKey};
