//! Playback orchestrator
//!
//! Owns the queue, the committed [`PlaybackSession`] and the single active
//! playback instance. Every command runs to completion on `&mut self`, and
//! state is only committed after the backend call it depends on resolved,
//! so observers never see a half-applied transition.

use crate::capability::{
    BackendNotification, InstanceId, InstanceNotification, InstanceStatus, NotificationSink,
    PlaybackInstance, ProviderRegistry,
};
use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::persistence::PersistedPlayback;
use crate::progress::{round_progress, ProgressScheduler, TickOutcome};
use crate::queue::{Queue, QueueEntry, QueueEntryId};
use crate::session::{PlaybackSession, PlaybackSnapshot, SessionStore};
use crate::types::{CapabilityOperation, PlaybackFault, PlaybackState, RepeatMode};
use crate::volume::VolumeState;
use soul_core::{Track, TrackCatalog, TrackListId};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// The instance currently bound to the session's entry
struct ActiveInstance {
    id: InstanceId,
    entry: QueueEntryId,
    handle: Box<dyn PlaybackInstance>,
}

#[derive(Debug, Clone, Copy)]
enum CapabilityCall {
    Play,
    Seek(u32),
    Pause,
    Resume,
    Stop,
    ChangeVolume { value: u8, max: u8 },
    Mute,
    Unmute,
}

impl CapabilityCall {
    fn operation(self) -> CapabilityOperation {
        match self {
            Self::Play => CapabilityOperation::Play,
            Self::Seek(_) => CapabilityOperation::Seek,
            Self::Pause => CapabilityOperation::Pause,
            Self::Resume => CapabilityOperation::Resume,
            Self::Stop => CapabilityOperation::Stop,
            Self::ChangeVolume { .. } => CapabilityOperation::ChangeVolume,
            Self::Mute => CapabilityOperation::Mute,
            Self::Unmute => CapabilityOperation::Unmute,
        }
    }
}

/// Result of applying a persisted session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExhaustOutcome {
    /// Live playback was running; the persisted session was ignored
    SkippedLiveSession,

    /// Persisted session applied
    Restored {
        /// Entries rebuilt from the catalog
        entries: usize,
        /// Entries whose track could not be resolved
        dropped: usize,
        /// Entry loaded (paused) at its persisted position
        loaded: Option<QueueEntryId>,
    },
}

/// Playback orchestrator
pub struct PlaybackOrchestrator {
    config: PlaybackConfig,
    providers: ProviderRegistry,
    catalog: Arc<dyn TrackCatalog>,
    store: SessionStore,

    session: PlaybackSession,
    queue: Queue,
    active: Option<ActiveInstance>,
    scheduler: ProgressScheduler,

    notifications_tx: mpsc::UnboundedSender<InstanceNotification>,
    notifications_rx: mpsc::UnboundedReceiver<InstanceNotification>,
    next_instance_id: u64,
}

impl PlaybackOrchestrator {
    /// Create an orchestrator publishing into `store`
    pub fn new(
        config: PlaybackConfig,
        providers: ProviderRegistry,
        catalog: Arc<dyn TrackCatalog>,
        store: SessionStore,
    ) -> Self {
        let (notifications_tx, notifications_rx) = mpsc::unbounded_channel();
        let session = PlaybackSession::new(config.initial_volume());
        let scheduler = ProgressScheduler::new(config.loading_timeout());

        let orchestrator = Self {
            config,
            providers,
            catalog,
            store,
            session,
            queue: Queue::new(),
            active: None,
            scheduler,
            notifications_tx,
            notifications_rx,
            next_instance_id: 0,
        };
        orchestrator.publish();
        orchestrator
    }

    // ===== Observation =====

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            session: self.session.clone(),
            queue: self.queue.entries().to_vec(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.store.subscribe()
    }

    pub fn current_entry(&self) -> Option<&QueueEntry> {
        self.session.current_entry.and_then(|id| self.queue.get(id))
    }

    pub fn current_track(&self) -> Option<&Arc<Track>> {
        self.current_entry().map(|e| e.track())
    }

    /// Identifier of the live instance, if one is loaded
    pub fn active_instance(&self) -> Option<InstanceId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Whether the progress scheduler wants another tick
    pub fn is_ticking(&self) -> bool {
        self.scheduler.is_scheduled()
    }

    // ===== Track selection =====

    /// Play a single track, replacing the queue
    ///
    /// If the same track is already loaded this resumes it instead.
    pub async fn play_track(&mut self, track: Track) -> Result<bool> {
        let already_loaded = self.active.is_some()
            && self
                .current_track()
                .is_some_and(|current| current.same_identity(&track));
        if already_loaded {
            debug!("{} already loaded, resuming", track.key());
            return self.resume().await;
        }

        info!("Playing track {}", track.key());
        self.retire_active(true).await;
        self.enter_stopped();

        let ids = self.queue.replace(vec![Arc::new(track)], None);
        self.session.current_track_list = None;

        let Some(&first) = ids.first() else {
            return Err(PlaybackError::QueueEmpty);
        };
        self.start_entry(first).await
    }

    /// Replace the queue with `tracks` and play the first one
    pub async fn play_tracks(
        &mut self,
        tracks: Vec<Track>,
        track_list: Option<TrackListId>,
    ) -> Result<bool> {
        if tracks.is_empty() {
            return Err(PlaybackError::QueueEmpty);
        }

        info!(
            "Playing {} tracks from {}",
            tracks.len(),
            track_list.as_ref().map_or("an ad-hoc list", |l| l.as_str())
        );
        self.retire_active(true).await;
        self.enter_stopped();

        let tracks = tracks.into_iter().map(Arc::new).collect();
        let ids = self.queue.replace(tracks, track_list.clone());
        let Some(&first) = ids.first() else {
            return Err(PlaybackError::QueueEmpty);
        };

        if self.session.shuffle_enabled {
            self.queue.shuffle_keeping(Some(first));
        }
        self.session.current_track_list = track_list;

        self.start_entry(first).await
    }

    /// Jump to an entry already in the queue
    pub async fn play_entry(&mut self, entry: QueueEntryId) -> Result<bool> {
        if self.queue.get(entry).is_none() {
            return Err(PlaybackError::EntryNotFound(entry));
        }
        self.start_entry(entry).await
    }

    /// Play the entry after the current one
    ///
    /// Wraps to the first entry when repeating the queue.
    pub async fn play_next(&mut self) -> Result<bool> {
        let Some(current) = self.session.current_entry else {
            return Ok(false);
        };
        self.advance_from(current).await
    }

    /// Play the previous entry, or restart the current one
    ///
    /// Restarts when more than `previous_restart_fraction` of the track has
    /// been played or when the current entry is the first.
    pub async fn play_previous(&mut self) -> Result<bool> {
        let Some(current) = self.session.current_entry else {
            return Ok(false);
        };

        let duration = self.current_duration();
        let played = if duration > 0 {
            f64::from(self.session.progress_seconds.unwrap_or(0)) / f64::from(duration)
        } else {
            0.0
        };

        match self.queue.previous_before(current) {
            Some(previous) if played <= self.config.previous_restart_fraction => {
                self.start_entry(previous).await
            }
            _ => self.seek(0).await,
        }
    }

    // ===== Transport =====

    pub async fn pause(&mut self) -> Result<bool> {
        if self.session.current_entry.is_none() {
            return Ok(false);
        }

        if !self.invoke(CapabilityCall::Pause).await? {
            self.publish();
            return Ok(false);
        }

        self.session.progress_seconds = Some(self.active_progress());
        self.session.state = PlaybackState::Paused;
        self.scheduler.cancel();
        self.publish();
        Ok(true)
    }

    pub async fn resume(&mut self) -> Result<bool> {
        if self.session.current_entry.is_none() {
            return Ok(false);
        }

        if !self.invoke(CapabilityCall::Resume).await? {
            self.publish();
            return Ok(false);
        }

        self.session.fault = None;
        self.commit_playing();
        Ok(true)
    }

    /// Stop playback and release the instance
    pub async fn stop(&mut self) -> Result<bool> {
        if self.session.current_entry.is_none() {
            return Ok(false);
        }

        if !self.invoke(CapabilityCall::Stop).await? {
            self.publish();
            return Ok(false);
        }

        self.retire_active(false).await;
        self.enter_stopped();
        self.publish();
        Ok(true)
    }

    /// Seek the current entry to `position` seconds
    ///
    /// The new position is shown right away and rolled back if the backend
    /// refuses. While loading no position is shown; the next tick after
    /// loading reports it.
    pub async fn seek(&mut self, position: u32) -> Result<bool> {
        if self.session.current_entry.is_none() {
            return Ok(false);
        }

        let duration = self.current_duration();
        let target = if duration > 0 {
            position.min(duration)
        } else {
            position
        };
        if self.session.progress_seconds == Some(target) {
            return Ok(false);
        }

        let previous = self.session.progress_seconds;
        if self.session.state != PlaybackState::Loading {
            self.session.progress_seconds = Some(target);
            self.publish();
        }

        if !self.invoke(CapabilityCall::Seek(target)).await? {
            self.session.progress_seconds = previous;
            self.publish();
            return Ok(false);
        }

        if self.session.state == PlaybackState::Playing {
            self.scheduler.schedule();
            self.tick().await?;
        }
        Ok(true)
    }

    // ===== Volume =====

    /// Set the volume, unmuting first when muted and `value > 0`
    pub async fn change_volume(&mut self, value: u8) -> Result<bool> {
        let volume = self.session.volume;
        let value = volume.clamp(value);
        let unmute_first = volume.muted && value > 0;

        if value == volume.current && !unmute_first {
            return Ok(false);
        }

        if self.active.is_some() {
            if unmute_first && !self.invoke(CapabilityCall::Unmute).await? {
                self.publish();
                return Ok(false);
            }

            let changed = self
                .invoke(CapabilityCall::ChangeVolume {
                    value,
                    max: volume.max,
                })
                .await?;
            if !changed {
                if unmute_first {
                    self.invoke(CapabilityCall::Mute).await?;
                }
                self.publish();
                return Ok(false);
            }
        }

        self.session.volume.current = value;
        if unmute_first {
            self.session.volume.muted = false;
        }
        self.publish();
        Ok(true)
    }

    pub async fn mute(&mut self) -> Result<bool> {
        if self.session.volume.muted {
            return Ok(false);
        }

        if self.active.is_some() && !self.invoke(CapabilityCall::Mute).await? {
            self.publish();
            return Ok(false);
        }

        self.session.volume.muted = true;
        self.publish();
        Ok(true)
    }

    pub async fn unmute(&mut self) -> Result<bool> {
        if !self.session.volume.muted {
            return Ok(false);
        }

        if self.active.is_some() && !self.invoke(CapabilityCall::Unmute).await? {
            self.publish();
            return Ok(false);
        }

        self.session.volume.muted = false;
        self.publish();
        Ok(true)
    }

    pub async fn toggle_mute(&mut self) -> Result<bool> {
        if self.session.volume.muted {
            self.unmute().await
        } else {
            self.mute().await
        }
    }

    // ===== Modes =====

    /// Turn shuffle on or off
    ///
    /// Turning it on keeps the current entry first; turning it off puts the
    /// queue back in insertion order.
    pub fn set_shuffle(&mut self, enabled: bool) -> bool {
        if self.session.shuffle_enabled == enabled {
            return false;
        }

        if enabled {
            self.queue.shuffle_keeping(self.session.current_entry);
        } else {
            self.queue.restore_insertion_order();
        }
        self.session.shuffle_enabled = enabled;
        debug!("Shuffle {}", if enabled { "enabled" } else { "disabled" });
        self.publish();
        true
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.set_shuffle(!self.session.shuffle_enabled)
    }

    pub fn set_repeat(&mut self, mode: RepeatMode) -> bool {
        if self.session.repeat_mode == mode {
            return false;
        }
        self.session.repeat_mode = mode;
        debug!("Repeat mode set to {}", mode);
        self.publish();
        true
    }

    // ===== Queue editing =====

    /// Append tracks to the end of the queue
    pub fn enqueue(
        &mut self,
        tracks: Vec<Track>,
        track_list: Option<TrackListId>,
    ) -> Vec<QueueEntryId> {
        let ids = self
            .queue
            .append(tracks.into_iter().map(Arc::new).collect(), track_list);
        self.publish();
        ids
    }

    /// Insert tracks right after the current entry
    pub fn enqueue_next(
        &mut self,
        tracks: Vec<Track>,
        track_list: Option<TrackListId>,
    ) -> Vec<QueueEntryId> {
        let ids = self.queue.insert_after(
            self.session.current_entry,
            tracks.into_iter().map(Arc::new).collect(),
            track_list,
        );
        self.publish();
        ids
    }

    /// Remove an entry; removing the current one stops playback
    pub async fn remove_entry(&mut self, entry: QueueEntryId) -> Result<bool> {
        if self.queue.get(entry).is_none() {
            return Err(PlaybackError::EntryNotFound(entry));
        }

        if self.session.current_entry == Some(entry) {
            info!("Removing the current entry {}, stopping playback", entry);
            self.retire_active(true).await;
            self.enter_stopped();
        }

        self.queue.remove(entry);
        self.publish();
        Ok(true)
    }

    pub fn move_entry(&mut self, entry: QueueEntryId, to: usize) -> Result<bool> {
        self.queue.move_entry(entry, to)?;
        self.publish();
        Ok(true)
    }

    /// Stop playback and empty the queue
    pub async fn clear_queue(&mut self) -> Result<bool> {
        self.retire_active(true).await;
        self.enter_stopped();
        self.session.current_track_list = None;
        self.queue.clear();
        self.publish();
        Ok(true)
    }

    // ===== Frame loop =====

    /// Apply pending backend notifications
    ///
    /// Returns the number of notifications consumed, stale ones included.
    pub fn drain_notifications(&mut self) -> usize {
        let mut consumed = 0;
        while let Ok(notification) = self.notifications_rx.try_recv() {
            self.handle_notification(notification);
            consumed += 1;
        }
        consumed
    }

    /// Run one frame: drain notifications, then tick if scheduled
    pub async fn on_frame(&mut self) -> Result<TickOutcome> {
        self.drain_notifications();
        if !self.scheduler.is_scheduled() {
            return Ok(TickOutcome::Idle);
        }
        self.tick().await
    }

    async fn tick(&mut self) -> Result<TickOutcome> {
        let (status, raw_progress, entry) = match (self.session.current_entry, &self.active) {
            (Some(_), Some(active)) => (
                active.handle.status(),
                active.handle.progress(),
                active.entry,
            ),
            _ => {
                self.scheduler.cancel();
                return Ok(TickOutcome::Halted);
            }
        };
        let progress = round_progress(raw_progress, self.current_duration());

        match status {
            InstanceStatus::Playing => {
                self.scheduler.loading_finished();
                if self.session.state == PlaybackState::Loading {
                    self.session.state = PlaybackState::Playing;
                }
                self.session.progress_seconds = Some(progress);
                self.publish();
                self.scheduler.schedule();
                Ok(TickOutcome::Rescheduled)
            }
            InstanceStatus::Loading => {
                if !self.scheduler.observe_loading(Instant::now()) {
                    warn!(
                        "Entry {} still loading after {:?}, giving up",
                        entry,
                        self.config.loading_timeout()
                    );
                    self.scheduler.cancel();
                    self.record_fault(PlaybackFault::LoadingTimedOut { entry });
                    self.publish();
                    return Ok(TickOutcome::Halted);
                }

                self.session.state = PlaybackState::Loading;
                self.session.progress_seconds = None;
                self.publish();
                self.scheduler.schedule();
                Ok(TickOutcome::Rescheduled)
            }
            InstanceStatus::Ended => {
                self.session.progress_seconds = Some(progress);
                self.publish();
                if self.handle_entry_ended(entry).await? {
                    Ok(TickOutcome::Advanced)
                } else {
                    Ok(TickOutcome::Halted)
                }
            }
            InstanceStatus::Idle => {
                if self.session.state == PlaybackState::Paused {
                    debug!("Entry {} is paused, progress updates stopped", entry);
                } else {
                    warn!(
                        "Entry {} reported idle while {:?}, progress updates stopped",
                        entry, self.session.state
                    );
                }
                self.scheduler.cancel();
                self.session.progress_seconds = Some(progress);
                self.publish();
                Ok(TickOutcome::Halted)
            }
        }
    }

    async fn handle_entry_ended(&mut self, ended: QueueEntryId) -> Result<bool> {
        info!("Entry {} ended", ended);
        self.retire_active(false).await;
        self.enter_stopped();
        self.publish();

        match self.session.repeat_mode {
            RepeatMode::Track => self.start_entry(ended).await,
            RepeatMode::Off | RepeatMode::Queue => self.advance_from(ended).await,
        }
    }

    /// Apply a backend notification
    ///
    /// Notifications are cross-checked against the instance's current
    /// status, so a late `Started` or `Paused` cannot undo a transition a
    /// command committed after it was sent.
    fn handle_notification(&mut self, notification: InstanceNotification) {
        let status = match &self.active {
            Some(active) if active.id == notification.instance => active.handle.status(),
            _ => {
                debug!(
                    "Ignoring {:?} from retired {}",
                    notification.notification, notification.instance
                );
                return;
            }
        };

        let consistent = match notification.notification {
            BackendNotification::Started => status == InstanceStatus::Playing,
            BackendNotification::Paused => status == InstanceStatus::Idle,
            BackendNotification::Ended => true,
        };
        if !consistent {
            debug!(
                "Ignoring stale {:?} from {}, backend is {:?}",
                notification.notification, notification.instance, status
            );
            return;
        }

        match notification.notification {
            BackendNotification::Started => {
                if self.session.state == PlaybackState::Paused {
                    info!("Backend resumed playback");
                    self.session.state = PlaybackState::Playing;
                    self.publish();
                }
                self.scheduler.schedule();
            }
            BackendNotification::Paused => {
                if matches!(
                    self.session.state,
                    PlaybackState::Playing | PlaybackState::Loading
                ) {
                    info!("Backend paused playback");
                    self.session.state = PlaybackState::Paused;
                    self.session.progress_seconds = Some(self.active_progress());
                    self.scheduler.cancel();
                    self.publish();
                }
            }
            BackendNotification::Ended => self.scheduler.schedule(),
        }
    }

    // ===== Persistence =====

    /// Apply a persisted session
    ///
    /// Does nothing while playing. Otherwise flags and volume are applied,
    /// every entry is resolved through the catalog (unresolvable ones are
    /// dropped) and the persisted current entry is loaded paused at its
    /// saved position.
    pub async fn exhaust(&mut self, persisted: PersistedPlayback) -> Result<ExhaustOutcome> {
        if self.session.state == PlaybackState::Playing {
            info!("Playback is live, ignoring persisted session");
            return Ok(ExhaustOutcome::SkippedLiveSession);
        }

        self.retire_active(true).await;
        self.enter_stopped();

        self.session.shuffle_enabled = persisted.shuffle_enabled;
        self.session.repeat_mode = persisted.repeat_mode;
        self.session.volume = VolumeState {
            current: persisted.volume.current.min(self.config.volume_max),
            max: self.config.volume_max,
            muted: persisted.volume.muted,
        };

        let mut entries = Vec::with_capacity(persisted.queue.len());
        let mut dropped = 0;
        for item in &persisted.queue {
            match self
                .catalog
                .resolve_track(&item.provider, &item.provider_id)
                .await
            {
                Ok(Some(track)) => entries.push(QueueEntry::restored(
                    item.queue_entry_id,
                    item.insertion_index,
                    item.tracklist_id.clone(),
                    Arc::new(track),
                )),
                Ok(None) => {
                    debug!("{}:{} no longer exists, dropping it", item.provider, item.provider_id);
                    dropped += 1;
                }
                Err(e) => {
                    warn!(
                        "Failed to resolve {}:{}, dropping it: {}",
                        item.provider, item.provider_id, e
                    );
                    dropped += 1;
                }
            }
        }

        let restored = entries.len();
        self.queue.install_restored(entries);
        self.session.current_track_list = persisted.current_track_list.clone();
        self.publish();

        let mut loaded = None;
        if let Some(current) = persisted.current_entry {
            if self.queue.get(current).is_some() {
                match self.load_entry(current).await {
                    Ok(true) => {
                        loaded = Some(current);
                        if persisted.progress_seconds > 0 {
                            self.seek(persisted.progress_seconds).await?;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => warn!("Could not reload entry {}: {}", current, e),
                }
            } else {
                debug!("Persisted current entry {} was dropped", current);
            }
        }

        info!(
            "Restored playback session: {} entries, {} dropped",
            restored, dropped
        );
        Ok(ExhaustOutcome::Restored {
            entries: restored,
            dropped,
            loaded,
        })
    }

    /// Drop whatever a restore left behind and go back to an empty session
    ///
    /// Does nothing while playing.
    pub async fn discard_restored(&mut self) {
        if self.session.state == PlaybackState::Playing {
            return;
        }
        self.retire_active(true).await;
        self.enter_stopped();
        self.session.current_track_list = None;
        self.queue.clear();
        self.publish();
    }

    /// Stop the active instance (used on shutdown); the queue is kept
    pub async fn shutdown(&mut self) {
        self.drain_notifications();
        self.retire_active(true).await;
        self.enter_stopped();
        self.publish();
    }

    // ===== Internals =====

    fn publish(&self) {
        self.store.publish(self.snapshot());
    }

    fn current_duration(&self) -> u32 {
        self.current_track()
            .map(|track| track.duration_seconds())
            .unwrap_or(0)
    }

    fn active_progress(&self) -> u32 {
        self.active
            .as_ref()
            .map(|active| round_progress(active.handle.progress(), self.current_duration()))
            .unwrap_or(0)
    }

    fn enter_stopped(&mut self) {
        self.session.state = PlaybackState::Stopped;
        self.session.current_entry = None;
        self.session.progress_seconds = Some(0);
        self.scheduler.cancel();
    }

    fn commit_playing(&mut self) {
        self.session.state = PlaybackState::Playing;
        self.session.progress_seconds = Some(self.active_progress());
        self.scheduler.schedule();
        self.publish();
    }

    fn record_fault(&mut self, fault: PlaybackFault) {
        warn!("Playback fault: {}", fault);
        self.session.fault = Some(fault);
    }

    fn allocate_instance_id(&mut self) -> InstanceId {
        let id = InstanceId::new(self.next_instance_id);
        self.next_instance_id += 1;
        id
    }

    async fn advance_from(&mut self, entry: QueueEntryId) -> Result<bool> {
        let next = self.queue.next_after(entry).or_else(|| {
            if self.session.repeat_mode == RepeatMode::Queue {
                self.queue.first()
            } else {
                None
            }
        });

        match next {
            Some(next) => self.start_entry(next).await,
            None => {
                debug!("No entry after {}, staying stopped", entry);
                Ok(false)
            }
        }
    }

    async fn start_entry(&mut self, entry: QueueEntryId) -> Result<bool> {
        if !self.load_entry(entry).await? {
            return Ok(false);
        }

        if !self.invoke(CapabilityCall::Play).await? {
            self.publish();
            return Ok(false);
        }

        self.commit_playing();
        Ok(true)
    }

    /// Create an instance for `entry` and commit it paused
    ///
    /// The previous instance is retired first. On creation failure the
    /// session is left stopped with a fault.
    async fn load_entry(&mut self, entry_id: QueueEntryId) -> Result<bool> {
        let entry = self
            .queue
            .get(entry_id)
            .cloned()
            .ok_or(PlaybackError::EntryNotFound(entry_id))?;

        self.retire_active(true).await;
        self.enter_stopped();

        let provider = match self.providers.get(&entry.track().provider) {
            Ok(provider) => provider,
            Err(e) => {
                error!("No provider for {}: {}", entry.track().key(), e);
                self.publish();
                return Err(e);
            }
        };

        let instance_id = self.allocate_instance_id();
        let notifier = NotificationSink::new(instance_id, self.notifications_tx.clone());
        let handle = match provider.create_instance(entry.track(), notifier).await {
            Ok(handle) => handle,
            Err(e) => {
                self.record_fault(PlaybackFault::InstanceUnavailable {
                    track: entry.track().key(),
                    message: e.to_string(),
                });
                self.publish();
                return Ok(false);
            }
        };

        debug!("Created {} for entry {} ({})", instance_id, entry_id, entry.track().key());
        self.active = Some(ActiveInstance {
            id: instance_id,
            entry: entry_id,
            handle,
        });
        self.session.state = PlaybackState::Paused;
        self.session.current_entry = Some(entry_id);
        self.session.progress_seconds = Some(0);
        self.session.fault = None;
        self.publish();

        if !self.sync_volume().await? {
            warn!("{} did not accept the session volume", instance_id);
            self.publish();
        }
        Ok(true)
    }

    /// Push the session volume to a freshly created instance
    ///
    /// Returns whether the backend accepted all of it. A refusal stays
    /// recorded as the session fault, and a refused mute is reflected in
    /// the session since the instance plays audibly.
    async fn sync_volume(&mut self) -> Result<bool> {
        let volume = self.session.volume;
        let level_set = self
            .invoke(CapabilityCall::ChangeVolume {
                value: volume.current,
                max: volume.max,
            })
            .await?;

        let mut muted = true;
        if volume.muted {
            muted = self.invoke(CapabilityCall::Mute).await?;
            if !muted {
                self.session.volume.muted = false;
            }
        }
        Ok(level_set && muted)
    }

    /// Stop (optionally) and drop the active instance
    ///
    /// Its notification sink becomes stale immediately.
    async fn retire_active(&mut self, stop_backend: bool) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        self.scheduler.cancel();

        if stop_backend {
            match active.handle.stop().await {
                Ok(true) => {}
                Ok(false) => warn!("{} declined stop while being retired", active.id),
                Err(e) => warn!("{} failed to stop while being retired: {}", active.id, e),
            }
        }
        debug!("Retired {} (entry {})", active.id, active.entry);
    }

    /// Call the active instance, turning refusals into a recorded fault
    async fn invoke(&mut self, call: CapabilityCall) -> Result<bool> {
        let operation = call.operation();
        debug_assert!(
            self.active.is_some(),
            "{} requested without an active instance",
            operation
        );
        let Some(active) = self.active.as_mut() else {
            error!(
                "No active instance for {} while entry {:?} is current",
                operation, self.session.current_entry
            );
            return Err(PlaybackError::invariant(format!(
                "{} requested without an active instance",
                operation
            )));
        };

        let result = match call {
            CapabilityCall::Play => active.handle.play().await,
            CapabilityCall::Seek(position) => active.handle.seek(position).await,
            CapabilityCall::Pause => active.handle.pause().await,
            CapabilityCall::Resume => active.handle.resume().await,
            CapabilityCall::Stop => active.handle.stop().await,
            CapabilityCall::ChangeVolume { value, max } => {
                active.handle.change_volume(value, max).await
            }
            CapabilityCall::Mute => active.handle.mute().await,
            CapabilityCall::Unmute => active.handle.unmute().await,
        };
        let instance = active.id;

        match result {
            Ok(true) => Ok(true),
            Ok(false) => {
                warn!("{} declined {}", instance, operation);
                self.record_fault(PlaybackFault::CapabilityFailed {
                    operation,
                    message: None,
                });
                Ok(false)
            }
            Err(e) => {
                warn!("{} failed {}: {}", instance, operation, e);
                self.record_fault(PlaybackFault::CapabilityFailed {
                    operation,
                    message: Some(e.to_string()),
                });
                Ok(false)
            }
        }
    }
}
