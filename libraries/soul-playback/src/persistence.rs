//! Session persistence
//!
//! The live session is captured as a small JSON document holding only
//! track identities, never full track metadata. On startup the document
//! is applied through [`PlaybackOrchestrator::exhaust`], which resolves
//! every identity through the catalog again.

use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::orchestrator::PlaybackOrchestrator;
use crate::queue::QueueEntryId;
use crate::session::PlaybackSnapshot;
use crate::types::{PlaybackState, RepeatMode};
use crate::volume::VolumeState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use soul_core::{KeyValueStore, ProviderId, TrackId, TrackListId};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Format version written by [`PersistedPlayback::to_bytes`]
pub const PERSISTED_VERSION: u32 = 1;

/// Minimal identity of one queue entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedQueueEntry {
    pub id: TrackId,
    pub provider: ProviderId,
    pub provider_id: String,
    pub tracklist_id: Option<TrackListId>,
    pub queue_entry_id: QueueEntryId,
    pub insertion_index: u64,
}

/// Storable form of a playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPlayback {
    pub version: u32,

    /// Unix timestamp of the capture
    pub saved_at: i64,

    pub state: PlaybackState,
    pub current_entry: Option<QueueEntryId>,
    pub current_track_list: Option<TrackListId>,
    pub progress_seconds: u32,
    pub volume: VolumeState,
    pub shuffle_enabled: bool,
    pub repeat_mode: RepeatMode,
    pub queue: Vec<PersistedQueueEntry>,
}

impl PersistedPlayback {
    /// Capture a snapshot
    pub fn capture(snapshot: &PlaybackSnapshot) -> Self {
        let session = &snapshot.session;
        Self {
            version: PERSISTED_VERSION,
            saved_at: chrono::Utc::now().timestamp(),
            state: session.state,
            current_entry: session.current_entry,
            current_track_list: session.current_track_list.clone(),
            progress_seconds: session.progress_seconds.unwrap_or(0),
            volume: session.volume,
            shuffle_enabled: session.shuffle_enabled,
            repeat_mode: session.repeat_mode,
            queue: snapshot
                .queue
                .iter()
                .map(|entry| PersistedQueueEntry {
                    id: entry.track().id.clone(),
                    provider: entry.track().provider.clone(),
                    provider_id: entry.track().provider_id.clone(),
                    tracklist_id: entry.tracklist_id().cloned(),
                    queue_entry_id: entry.id(),
                    insertion_index: entry.insertion_index(),
                })
                .collect(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode and validate a stored document
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let persisted: Self = serde_json::from_slice(bytes)?;
        persisted.validate()?;
        Ok(persisted)
    }

    fn validate(&self) -> Result<()> {
        if self.version != PERSISTED_VERSION {
            return Err(PlaybackError::InvalidPersistedState(format!(
                "unsupported version {}",
                self.version
            )));
        }

        let mut seen = HashSet::with_capacity(self.queue.len());
        for entry in &self.queue {
            if !seen.insert(entry.queue_entry_id) {
                return Err(PlaybackError::InvalidPersistedState(format!(
                    "duplicate queue entry {}",
                    entry.queue_entry_id
                )));
            }
        }

        if let Some(current) = self.current_entry {
            if !seen.contains(&current) {
                return Err(PlaybackError::InvalidPersistedState(format!(
                    "current entry {} is not queued",
                    current
                )));
            }
        }

        Ok(())
    }
}

/// A piece of state that is saved to and restored from a blob
#[async_trait]
pub trait PersistentDomain: Send {
    /// Storage key of the blob
    fn key(&self) -> &str;

    fn serialize_blob(&self) -> Result<Vec<u8>>;

    async fn restore_blob(&mut self, blob: &[u8]) -> Result<()>;

    /// Return to the empty state after an interrupted restore
    async fn reset(&mut self);
}

#[async_trait]
impl PersistentDomain for PlaybackOrchestrator {
    fn key(&self) -> &str {
        &self.config().storage_key
    }

    fn serialize_blob(&self) -> Result<Vec<u8>> {
        PersistedPlayback::capture(&self.snapshot()).to_bytes()
    }

    async fn restore_blob(&mut self, blob: &[u8]) -> Result<()> {
        let persisted = PersistedPlayback::from_bytes(blob)?;
        self.exhaust(persisted).await?;
        Ok(())
    }

    async fn reset(&mut self) {
        self.discard_restored().await;
    }
}

/// Outcome of a startup restore
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: Vec<String>,

    /// Keys with nothing stored
    pub missing: Vec<String>,

    pub failed: Vec<String>,

    /// The restore budget ran out
    pub timed_out: bool,
}

impl RestoreReport {
    /// Whether every domain either restored or had nothing to restore
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.timed_out
    }
}

/// Saves and restores persistent domains through a key/value store
#[derive(Clone)]
pub struct PersistenceManager {
    store: Arc<dyn KeyValueStore>,
    restore_budget: Duration,
    save_throttle: Duration,
}

impl PersistenceManager {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &PlaybackConfig) -> Self {
        Self {
            store,
            restore_budget: config.restore_budget(),
            save_throttle: config.save_throttle(),
        }
    }

    /// Restore every domain within the restore budget
    ///
    /// Failures are reported, never returned: startup always continues.
    /// When the budget runs out, every domain that did not finish is reset.
    pub async fn restore_all(&self, domains: &mut [&mut dyn PersistentDomain]) -> RestoreReport {
        let mut report = RestoreReport::default();

        let restore = async {
            for domain in domains.iter_mut() {
                self.restore_domain(&mut **domain, &mut report).await;
            }
        };
        let timed_out = tokio::time::timeout(self.restore_budget, restore)
            .await
            .is_err();

        if timed_out {
            warn!(
                "Restore exceeded its {:?} budget, continuing with defaults",
                self.restore_budget
            );
            report.timed_out = true;
            for domain in domains.iter_mut() {
                if !report.restored.iter().any(|key| key == domain.key()) {
                    domain.reset().await;
                }
            }
        }

        info!(
            "Restore finished: {} restored, {} missing, {} failed",
            report.restored.len(),
            report.missing.len(),
            report.failed.len()
        );
        report
    }

    async fn restore_domain(&self, domain: &mut dyn PersistentDomain, report: &mut RestoreReport) {
        let key = domain.key().to_string();

        let blob = match self.store.load(&key).await {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!("Nothing stored for {}", key);
                report.missing.push(key);
                return;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", key, e);
                report.failed.push(key);
                return;
            }
        };

        match domain.restore_blob(&blob).await {
            Ok(()) => report.restored.push(key),
            Err(e) => {
                warn!("Failed to restore {}: {}", key, e);
                report.failed.push(key);
            }
        }
    }

    /// Save one domain immediately
    pub async fn save(&self, domain: &dyn PersistentDomain) -> Result<()> {
        let key = domain.key().to_string();
        let blob = domain.serialize_blob()?;
        self.store.save(&key, &blob).await?;
        debug!("Saved {} ({} bytes)", key, blob.len());
        Ok(())
    }

    /// Write a snapshot immediately (shutdown)
    pub async fn flush(&self, key: &str, snapshot: &PlaybackSnapshot) -> Result<()> {
        let blob = PersistedPlayback::capture(snapshot).to_bytes()?;
        self.store.save(key, &blob).await?;
        Ok(())
    }

    /// Save published snapshots in the background
    ///
    /// After a change the task waits `save_throttle` and writes the latest
    /// snapshot, so a burst of commits costs one write. Ends when the
    /// session store is dropped.
    pub fn spawn_autosave(
        &self,
        key: impl Into<String>,
        mut snapshots: watch::Receiver<PlaybackSnapshot>,
    ) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let throttle = self.save_throttle;
        let key = key.into();

        tokio::spawn(async move {
            while snapshots.changed().await.is_ok() {
                tokio::time::sleep(throttle).await;

                let snapshot = snapshots.borrow_and_update().clone();
                let blob = match PersistedPlayback::capture(&snapshot).to_bytes() {
                    Ok(blob) => blob,
                    Err(e) => {
                        warn!("Failed to encode playback session: {}", e);
                        continue;
                    }
                };

                if let Err(e) = store.save(&key, &blob).await {
                    warn!("Failed to save playback session: {}", e);
                }
            }
            debug!("Session store closed, autosave stopped");
        })
    }
}
