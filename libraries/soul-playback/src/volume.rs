//! Session volume state
//!
//! The core never processes samples; it tracks the level the user picked
//! and forwards `(value, max)` to the backend, which owns the gain curve.

use serde::{Deserialize, Serialize};

/// Volume level, ceiling and mute flag
///
/// Muting preserves `current` so unmuting restores the previous level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeState {
    /// Volume level (0..=max)
    pub current: u8,

    /// Volume ceiling
    pub max: u8,

    /// Mute state
    pub muted: bool,
}

impl VolumeState {
    /// Create a volume state, clamping `current` to `max`
    pub fn new(current: u8, max: u8) -> Self {
        Self {
            current: current.min(max),
            max,
            muted: false,
        }
    }

    /// Clamp a requested level to the ceiling
    pub fn clamp(&self, value: u8) -> u8 {
        value.min(self.max)
    }

    /// Level the listener actually hears (0 while muted)
    pub fn effective(&self) -> u8 {
        if self.muted {
            0
        } else {
            self.current
        }
    }

    /// Level as a fraction of the ceiling
    pub fn fraction(&self) -> f32 {
        if self.max == 0 {
            0.0
        } else {
            self.effective() as f32 / self.max as f32
        }
    }
}

impl Default for VolumeState {
    fn default() -> Self {
        Self::new(80, 100)
    }
}
