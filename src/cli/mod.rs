//! CLI Module
//!
//! Command-line interface for clipdeck.

pub mod commands;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::driver::ReverbPreset;

/// clipdeck - play sound clips through the default output device
#[derive(Parser, Debug)]
#[command(name = "clipdeck")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options shared by every command that opens a device
#[derive(Args, Debug, Clone, Default)]
pub struct DeviceOptions {
    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Render to the silent null device
    #[arg(long)]
    pub null: bool,

    /// Poll source states instead of waiting for completion notifications
    #[arg(long)]
    pub poll: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load clips, play them together and wait until they finish
    Play {
        /// WAV files to play
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Route every clip through a reverb preset
        #[arg(short, long)]
        reverb: Option<ReverbPreset>,

        #[command(flatten)]
        device: DeviceOptions,
    },

    /// Build a track from FILE[@SECONDS] entries and play it
    Track {
        #[arg(required = true)]
        entries: Vec<TrackArg>,

        #[command(flatten)]
        device: DeviceOptions,
    },

    /// Print header information and the device format of clip files
    Info {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List reverb presets
    Presets,
}

/// A `FILE[@SECONDS]` track entry
#[derive(Debug, Clone, PartialEq)]
pub struct TrackArg {
    pub path: PathBuf,
    pub offset: Duration,
}

impl FromStr for TrackArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((path, seconds)) = s.rsplit_once('@') {
            if let Ok(seconds) = seconds.parse::<f64>() {
                if !seconds.is_finite() || seconds < 0.0 {
                    return Err(format!("offset must be a non-negative number: '{}'", s));
                }
                if path.is_empty() {
                    return Err(format!("missing file before '@': '{}'", s));
                }
                let offset = Duration::try_from_secs_f64(seconds)
                    .map_err(|e| format!("offset out of range in '{}': {}", s, e))?;
                return Ok(Self {
                    path: PathBuf::from(path),
                    offset,
                });
            }
        }
        Ok(Self {
            path: PathBuf::from(s),
            offset: Duration::ZERO,
        })
    }
}
