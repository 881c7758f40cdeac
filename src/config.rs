//! Runtime configuration
//!
//! Everything is optional in the JSON file; missing sections fall back to
//! their defaults.
//!
//! ```json
//! {
//!   "device":   { "backend": "null", "period_frames": 256 },
//!   "playback": { "wait": "poll", "poll_interval_ms": 5 },
//!   "reverb":   "concert_hall"
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::driver::{ContextAttributes, ReverbPreset};
use crate::error::{AudioError, Result};

/// Largest channel count an output device may be configured with
pub const MAX_DEVICE_CHANNELS: u16 = 8;

// ============================================================================
// Sections
// ============================================================================

/// Which output backend to open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The platform's default output device (requires the `cpal` feature)
    #[default]
    Default,
    /// Silent device rendering on a timer thread
    Null,
}

/// Output device selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub backend: BackendKind,
    /// Output rate; `None` keeps the device's preferred rate
    pub sample_rate: Option<u32>,
    /// Output channels; `None` keeps the device's preferred layout
    pub channels: Option<u16>,
    /// Frames mixed per output period
    pub period_frames: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Default,
            sample_rate: None,
            channels: None,
            period_frames: 512,
        }
    }
}

/// Clip loader limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Largest decode scratch buffer the loader will allocate, in bytes
    pub max_decode_bytes: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_decode_bytes: 512 * 1024 * 1024,
        }
    }
}

/// How `wait_for_clips` detects that playback finished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitStrategy {
    /// Block on the mixer's completion notification
    #[default]
    Notify,
    /// Sleep and re-check source states
    Poll,
}

/// Playback completion settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub wait: WaitStrategy,
    pub poll_interval_ms: u64,
    /// Added to the longest clip duration to form the wait timeout
    pub timeout_slack_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            wait: WaitStrategy::Notify,
            poll_interval_ms: 10,
            timeout_slack_ms: 500,
        }
    }
}

// ============================================================================
// AudioConfig
// ============================================================================

/// Complete configuration for an [`AudioSubsystem`](crate::AudioSubsystem)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub device: DeviceConfig,
    pub limits: ContextAttributes,
    pub loader: LoaderConfig,
    pub playback: PlaybackConfig,
    /// Reverb applied by the CLI when no preset is given on the command line
    pub reverb: Option<ReverbPreset>,
}

impl AudioConfig {
    /// Read and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: AudioConfig =
            serde_json::from_str(&text).map_err(|e| AudioError::Config {
                reason: format!("{}: {}", path.display(), e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration for the silent null backend
    pub fn null() -> Self {
        let mut config = Self::default();
        config.device.backend = BackendKind::Null;
        config
    }

    /// Check values serde cannot express as constraints
    pub fn validate(&self) -> Result<()> {
        if self.device.period_frames == 0 {
            return Err(config_error("device.period_frames must be non-zero"));
        }
        if self.device.sample_rate == Some(0) {
            return Err(config_error("device.sample_rate must be non-zero"));
        }
        if let Some(channels) = self.device.channels {
            if channels == 0 || channels > MAX_DEVICE_CHANNELS {
                return Err(AudioError::Config {
                    reason: format!(
                        "device.channels must be between 1 and {}, got {}",
                        MAX_DEVICE_CHANNELS, channels
                    ),
                });
            }
        }
        if self.playback.poll_interval_ms == 0 {
            return Err(config_error("playback.poll_interval_ms must be non-zero"));
        }
        Ok(())
    }
}

fn config_error(reason: &str) -> AudioError {
    AudioError::Config {
        reason: reason.to_string(),
    }
}
