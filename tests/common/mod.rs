//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use clipdeck::AudioConfig;
use hound::{SampleFormat, WavSpec, WavWriter};

/// Events recorded by a successful null-device `init`
pub const INIT_EVENTS: usize = 3;

/// Null-backend config with a short mixing period and a tight wait slack
pub fn null_config() -> AudioConfig {
    let mut config = AudioConfig::null();
    config.device.period_frames = 256;
    config.playback.timeout_slack_ms = 1000;
    config
}

/// Write a 16-bit sine clip with `channels` channels
pub fn write_sine(dir: &Path, name: &str, channels: u16, sample_rate: u32, frames: u32) -> PathBuf {
    let path = dir.join(name);
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let sample = ((t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.5 * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(sample).unwrap();
        }
    }
    writer.finalize().unwrap();
    path
}

/// Write a mono clip in an arbitrary sample layout, filled with silence
pub fn write_silence(dir: &Path, name: &str, bits: u16, format: SampleFormat, frames: u32) -> PathBuf {
    let path = dir.join(name);
    let spec = WavSpec {
        channels: 1,
        sample_rate: 22050,
        bits_per_sample: bits,
        sample_format: format,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for _ in 0..frames {
        match (format, bits) {
            (SampleFormat::Float, _) => writer.write_sample(0.0f32).unwrap(),
            (SampleFormat::Int, 8) => writer.write_sample(0i8).unwrap(),
            (SampleFormat::Int, 16) => writer.write_sample(0i16).unwrap(),
            (SampleFormat::Int, _) => writer.write_sample(0i32).unwrap(),
        }
    }
    writer.finalize().unwrap();
    path
}

/// Cut `bytes` bytes off the end of `path`, leaving its header claiming
/// the original length
pub fn truncate(path: &Path, bytes: u64) {
    let file = OpenOptions::new().write(true).open(path).unwrap();
    let len = file.metadata().unwrap().len();
    file.set_len(len - bytes).unwrap();
}
