//! Progress scheduler
//!
//! Cooperative, frame-driven polling of the active instance. The scheduler
//! itself only remembers whether a tick is wanted and how long the backend
//! has been loading; the orchestrator runs the tick on its own task.

use std::time::Duration;
use tokio::time::Instant;

/// Result of one scheduler tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing was scheduled
    Idle,

    /// Progress observed, another tick is scheduled
    Rescheduled,

    /// Scheduling stopped (nothing loaded, backend idle or loading timed out)
    Halted,

    /// The entry ended and the orchestrator moved on
    Advanced,
}

/// Scheduling flag plus loading bookkeeping
#[derive(Debug, Clone)]
pub struct ProgressScheduler {
    scheduled: bool,
    loading_since: Option<Instant>,
    loading_timeout: Duration,
}

impl ProgressScheduler {
    pub fn new(loading_timeout: Duration) -> Self {
        Self {
            scheduled: false,
            loading_since: None,
            loading_timeout,
        }
    }

    /// Request a tick on the next frame
    pub fn schedule(&mut self) {
        self.scheduled = true;
    }

    /// Stop ticking and forget any loading episode
    pub fn cancel(&mut self) {
        self.scheduled = false;
        self.loading_since = None;
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    /// Record that the backend is loading at `now`
    ///
    /// Returns `false` once the backend has been loading for longer than
    /// the timeout.
    pub fn observe_loading(&mut self, now: Instant) -> bool {
        let since = *self.loading_since.get_or_insert(now);
        now.saturating_duration_since(since) < self.loading_timeout
    }

    /// The backend left its loading state
    pub fn loading_finished(&mut self) {
        self.loading_since = None;
    }
}

/// Round backend progress to whole seconds, clamped to the duration
///
/// A `duration` of 0 means unknown and disables clamping.
pub fn round_progress(raw: f64, duration: u32) -> u32 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }

    let rounded = raw.round().min(f64::from(u32::MAX)) as u32;
    if duration > 0 {
        rounded.min(duration)
    } else {
        rounded
    }
}
