//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};

use log::{info, warn};

use super::{DeviceOptions, TrackArg};
use crate::audio::{resolve_format, AudioSubsystem, ClipFile, Track};
use crate::config::{AudioConfig, BackendKind, WaitStrategy};
use crate::driver::ReverbPreset;
use crate::error::Result;

impl DeviceOptions {
    /// Configuration file (or defaults) with the command-line overrides applied
    pub fn resolve(&self) -> Result<AudioConfig> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Using configuration: {}", path.display());
                AudioConfig::load(path)?
            }
            None => AudioConfig::default(),
        };
        if self.null {
            config.device.backend = BackendKind::Null;
        }
        if self.poll {
            config.playback.wait = WaitStrategy::Poll;
        }
        Ok(config)
    }
}

/// Load every file, play them together and wait for the last one to end.
pub fn play(files: &[PathBuf], reverb: Option<ReverbPreset>, options: &DeviceOptions) -> Result<()> {
    let config = options.resolve()?;
    let preset = reverb.or(config.reverb);
    let audio = AudioSubsystem::init(config)?;

    let clips = files
        .iter()
        .map(|path| audio.load_clip(path))
        .collect::<Result<Vec<_>>>()?;

    let environment = preset.map(|p| audio.create_reverb(p)).transpose()?;
    if let Some(environment) = &environment {
        for clip in &clips {
            environment.route(clip)?;
        }
    }

    audio.play_clips(&clips)?;
    println!("Playing {} clip(s) on '{}'", clips.len(), audio.device().name());
    if let Some(preset) = preset {
        println!("Reverb: {}", preset);
    }
    audio.wait_for_clips(&clips)?;

    drop(environment);
    drop(clips);
    audio.shutdown();
    Ok(())
}

/// Play a track built from `FILE[@SECONDS]` entries.
pub fn track(entries: &[TrackArg], options: &DeviceOptions) -> Result<()> {
    let config = options.resolve()?;
    let audio = AudioSubsystem::init(config)?;

    let clips = entries
        .iter()
        .map(|entry| audio.load_clip(&entry.path))
        .collect::<Result<Vec<_>>>()?;

    let mut track = Track::new();
    for (index, entry) in entries.iter().enumerate() {
        track.add(index, entry.offset);
    }

    println!("Track with {} entries:", track.len());
    for entry in &track {
        println!(
            "  {:>8.3}s  {}",
            entry.offset.as_secs_f64(),
            clips[entry.clip].path().display()
        );
    }
    if track.iter().any(|e| !e.offset.is_zero()) {
        warn!("Track offsets are recorded only; all entries start together");
    }

    audio.play_track(&track, &clips)?;
    audio.wait_for_clips(&clips)?;

    drop(clips);
    audio.shutdown();
    Ok(())
}

/// Print header facts without opening a device.
pub fn info(files: &[PathBuf]) -> Result<()> {
    for path in files {
        print_info(path)?;
    }
    Ok(())
}

fn print_info(path: &Path) -> Result<()> {
    let file = ClipFile::open(path)?;
    let header = file.info();
    let format = resolve_format(header.encoding, header.channels);
    let seconds = if header.sample_rate == 0 {
        0.0
    } else {
        header.frames as f64 / header.sample_rate as f64
    };

    println!("{}", path.display());
    println!("  Frames:      {}", header.frames);
    println!("  Sample rate: {}Hz", header.sample_rate);
    println!("  Channels:    {}", header.channels);
    println!("  Encoding:    {}", header.encoding);
    println!("  Duration:    {:.3}s", seconds);
    println!("  Format:      {}", format);
    Ok(())
}

/// List the reverb presets with their decay times.
pub fn presets() {
    for preset in ReverbPreset::ALL {
        let properties = preset.properties();
        println!(
            "{:<14} decay {:>5.2}s  density {:.2}",
            preset.name(),
            properties.decay_time,
            properties.density
        );
    }
}
