//! Soul Player - Playback Management
//!
//! Platform-agnostic playback queue and state machine for Soul Player.
//!
//! This crate provides:
//! - A flat playback queue with stable per-insertion entry ids
//! - Shuffle (current entry pinned) and repeat modes (Off, Track, Queue)
//! - A playback orchestrator committing state only after backends confirm
//! - A frame-driven progress scheduler with auto-advance
//! - Session persistence and startup restore through a key/value store
//! - A controller task serializing commands from many callers
//!
//! # Architecture
//!
//! `soul-playback` knows nothing about decoding or audio output. Backends
//! implement [`PlaybackProvider`] and [`PlaybackInstance`]; track lookup
//! goes through [`soul_core::TrackCatalog`] and storage through
//! [`soul_core::KeyValueStore`].
//!
//! # Example: Controller
//!
//! ```rust,no_run
//! use soul_playback::{
//!     PlaybackCommand, PlaybackConfig, PlaybackController, PlaybackOrchestrator,
//!     ProviderRegistry, SessionStore,
//! };
//! # use std::sync::Arc;
//! # async fn example(
//! #     local: Arc<dyn soul_playback::PlaybackProvider>,
//! #     catalog: Arc<dyn soul_core::TrackCatalog>,
//! #     tracks: Vec<soul_core::Track>,
//! # ) -> soul_playback::Result<()> {
//! let orchestrator = PlaybackOrchestrator::new(
//!     PlaybackConfig::default(),
//!     ProviderRegistry::new().with(local),
//!     catalog,
//!     SessionStore::new(),
//! );
//!
//! let (handle, _task) = PlaybackController::spawn(orchestrator);
//! let mut snapshots = handle.subscribe();
//!
//! handle
//!     .execute(PlaybackCommand::PlayTracks { tracks, track_list: None })
//!     .await?;
//!
//! snapshots.changed().await.ok();
//! println!("{:?}", snapshots.borrow().session.state);
//! # Ok(())
//! # }
//! ```

mod capability;
mod command;
mod config;
mod controller;
mod error;
mod orchestrator;
mod persistence;
mod progress;
mod queue;
mod session;
mod shuffle;
pub mod types;
mod volume;

// Public exports
pub use capability::{
    BackendNotification, InstanceId, InstanceNotification, InstanceStatus, NotificationSink,
    PlaybackInstance, PlaybackProvider, ProviderRegistry,
};
pub use command::PlaybackCommand;
pub use config::PlaybackConfig;
pub use controller::{PlaybackController, PlaybackHandle};
pub use error::{PlaybackError, Result};
pub use orchestrator::{ExhaustOutcome, PlaybackOrchestrator};
pub use persistence::{
    PersistedPlayback, PersistedQueueEntry, PersistenceManager, PersistentDomain, RestoreReport,
    PERSISTED_VERSION,
};
pub use progress::{round_progress, ProgressScheduler, TickOutcome};
pub use queue::{Queue, QueueEntry, QueueEntryId};
pub use session::{PlaybackSession, PlaybackSnapshot, SessionStore};
pub use shuffle::{shuffle_entries, shuffle_entries_with};
pub use types::{CapabilityOperation, PlaybackFault, PlaybackState, RepeatMode};
pub use volume::VolumeState;
