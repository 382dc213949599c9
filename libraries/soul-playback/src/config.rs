//! Playback configuration
//!
//! Loaded from an optional TOML file, then overridden by `SOUL_PLAYBACK_*`
//! environment variables (for example `SOUL_PLAYBACK_LOADING_TIMEOUT_MS`).

use crate::error::{PlaybackError, Result};
use crate::volume::VolumeState;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the playback orchestrator and its persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Initial volume level (default: 80)
    #[serde(default = "default_volume")]
    pub default_volume: u8,

    /// Volume ceiling passed to backends (default: 100)
    #[serde(default = "default_volume_max")]
    pub volume_max: u8,

    /// Played fraction above which "previous" restarts the current track
    #[serde(default = "default_previous_restart_fraction")]
    pub previous_restart_fraction: f64,

    /// Progress scheduler cadence (default: 16 ms, one display frame)
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// How long a backend may stay loading before a fault is raised
    #[serde(default = "default_loading_timeout_ms")]
    pub loading_timeout_ms: u64,

    /// Budget for restoring every persisted domain at startup
    #[serde(default = "default_restore_budget_ms")]
    pub restore_budget_ms: u64,

    /// Minimum delay between two autosave writes
    #[serde(default = "default_save_throttle_ms")]
    pub save_throttle_ms: u64,

    /// Key of the playback blob in the key/value store
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

impl PlaybackConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            if path.exists() {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("SOUL_PLAYBACK").try_parsing(true),
        );

        let config: Self = settings
            .build()
            .map_err(|e| PlaybackError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| PlaybackError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.volume_max == 0 {
            return Err(PlaybackError::Config(
                "volume_max must be greater than zero".to_string(),
            ));
        }

        if self.default_volume > self.volume_max {
            return Err(PlaybackError::Config(format!(
                "default_volume {} exceeds volume_max {}",
                self.default_volume, self.volume_max
            )));
        }

        if !(0.0..=1.0).contains(&self.previous_restart_fraction) {
            return Err(PlaybackError::Config(format!(
                "previous_restart_fraction must be within 0..=1, got {}",
                self.previous_restart_fraction
            )));
        }

        if self.frame_interval_ms == 0 {
            return Err(PlaybackError::Config(
                "frame_interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.storage_key.is_empty() {
            return Err(PlaybackError::Config("storage_key is required".to_string()));
        }

        Ok(())
    }

    pub fn initial_volume(&self) -> VolumeState {
        VolumeState::new(self.default_volume, self.volume_max)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn loading_timeout(&self) -> Duration {
        Duration::from_millis(self.loading_timeout_ms)
    }

    pub fn restore_budget(&self) -> Duration {
        Duration::from_millis(self.restore_budget_ms)
    }

    pub fn save_throttle(&self) -> Duration {
        Duration::from_millis(self.save_throttle_ms)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
            volume_max: default_volume_max(),
            previous_restart_fraction: default_previous_restart_fraction(),
            frame_interval_ms: default_frame_interval_ms(),
            loading_timeout_ms: default_loading_timeout_ms(),
            restore_budget_ms: default_restore_budget_ms(),
            save_throttle_ms: default_save_throttle_ms(),
            storage_key: default_storage_key(),
        }
    }
}

// Default values
fn default_volume() -> u8 {
    80
}

fn default_volume_max() -> u8 {
    100
}

fn default_previous_restart_fraction() -> f64 {
    0.3
}

fn default_frame_interval_ms() -> u64 {
    16
}

fn default_loading_timeout_ms() -> u64 {
    30_000
}

fn default_restore_budget_ms() -> u64 {
    5_000
}

fn default_save_throttle_ms() -> u64 {
    1_000
}

fn default_storage_key() -> String {
    "playback".to_string()
}
