//! Playback capability abstraction
//!
//! Backends (local files, remote services) implement [`PlaybackProvider`]
//! to create one [`PlaybackInstance`] per loaded track. The orchestrator
//! only ever talks to these traits and never knows which backend is behind
//! them.

use crate::error::{PlaybackError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use soul_core::{ProviderId, Track};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identifier of a created playback instance
///
/// Monotonic per orchestrator; a notification carrying an id other than the
/// active instance's is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance-{}", self.0)
    }
}

/// Backend status as seen by the progress scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    Playing,
    Loading,
    Ended,
    /// Paused, stopped or not started yet
    Idle,
}

/// A loaded track inside a backend
///
/// Every control operation resolves to `Ok(true)` on success and
/// `Ok(false)` when the backend declines; `Err` is reserved for backend
/// faults. The predicates are mutually exclusive.
#[async_trait]
pub trait PlaybackInstance: Send {
    async fn play(&mut self) -> Result<bool>;

    /// Seek to a position in whole seconds
    async fn seek(&mut self, position: u32) -> Result<bool>;

    async fn pause(&mut self) -> Result<bool>;

    async fn resume(&mut self) -> Result<bool>;

    async fn stop(&mut self) -> Result<bool>;

    /// Set the output level to `value` out of `max`
    async fn change_volume(&mut self, value: u8, max: u8) -> Result<bool>;

    async fn mute(&mut self) -> Result<bool>;

    async fn unmute(&mut self) -> Result<bool>;

    /// Current position in (fractional) seconds
    fn progress(&self) -> f64;

    fn is_playing(&self) -> bool;

    fn is_loading(&self) -> bool;

    fn is_ended(&self) -> bool;

    fn status(&self) -> InstanceStatus {
        if self.is_ended() {
            InstanceStatus::Ended
        } else if self.is_loading() {
            InstanceStatus::Loading
        } else if self.is_playing() {
            InstanceStatus::Playing
        } else {
            InstanceStatus::Idle
        }
    }
}

/// Unsolicited transition reported by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendNotification {
    /// Audio started (or resumed from a media key)
    Started,

    /// Audio paused (media key, output device removed, ...)
    Paused,

    /// Reached the end of the track
    Ended,
}

/// Notification tagged with the instance that sent it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceNotification {
    pub instance: InstanceId,
    pub notification: BackendNotification,
}

/// Channel a backend uses to report [`BackendNotification`]s
///
/// Handed to the provider on instance creation. Safe to call from any
/// thread, including audio callbacks.
#[derive(Debug, Clone)]
pub struct NotificationSink {
    instance: InstanceId,
    tx: mpsc::UnboundedSender<InstanceNotification>,
}

impl NotificationSink {
    pub(crate) fn new(instance: InstanceId, tx: mpsc::UnboundedSender<InstanceNotification>) -> Self {
        Self { instance, tx }
    }

    /// Instance this sink reports for
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Report a notification
    ///
    /// Returns `false` once the orchestrator is gone.
    pub fn notify(&self, notification: BackendNotification) -> bool {
        self.tx
            .send(InstanceNotification {
                instance: self.instance,
                notification,
            })
            .is_ok()
    }
}

/// Factory for playback instances of one backend
#[async_trait]
pub trait PlaybackProvider: Send + Sync {
    /// Provider identifier matched against `Track::provider`
    fn identifier(&self) -> ProviderId;

    /// Create an instance for `track`
    ///
    /// The instance must not start playing until `play` is called.
    async fn create_instance(
        &self,
        track: &Track,
        notifier: NotificationSink,
    ) -> Result<Box<dyn PlaybackInstance>>;
}

/// Registered providers, keyed by identifier
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn PlaybackProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, returning the one it replaced
    pub fn register(
        &mut self,
        provider: Arc<dyn PlaybackProvider>,
    ) -> Option<Arc<dyn PlaybackProvider>> {
        self.providers.insert(provider.identifier(), provider)
    }

    #[must_use]
    pub fn with(mut self, provider: Arc<dyn PlaybackProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Look up the provider for an identifier
    pub fn get(&self, identifier: &ProviderId) -> Result<Arc<dyn PlaybackProvider>> {
        self.providers
            .get(identifier)
            .cloned()
            .ok_or_else(|| PlaybackError::UnknownProvider(identifier.clone()))
    }

    pub fn contains(&self, identifier: &ProviderId) -> bool {
        self.providers.contains_key(identifier)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &ProviderId> {
        self.providers.keys()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.providers.keys()).finish()
    }
}
