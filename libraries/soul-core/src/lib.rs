//! Soul Player Core
//!
//! Platform-agnostic track identity types, collaborator traits, and error
//! handling shared by the playback core.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `TrackKey`, and the id newtypes
//! - **Collaborator Traits**: `TrackCatalog` (resolves persisted identities
//!   to full metadata) and `KeyValueStore` (opaque durable storage)
//! - **Error Handling**: Unified `SoulError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use soul_core::types::{ProviderId, Track};
//!
//! let track = Track::new("42", ProviderId::new("local"), "/music/song.flac", "My Song")
//!     .with_artist("Artist")
//!     .with_duration_ms(183_000);
//!
//! assert_eq!(track.duration_seconds(), 183);
//! assert_eq!(track.key().provider.as_str(), "local");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod error;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use catalog::TrackCatalog;
pub use error::{Result, SoulError};
pub use storage::KeyValueStore;
pub use types::{ProviderId, Track, TrackId, TrackKey, TrackListId};
