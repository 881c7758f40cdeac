//! clipdeck - sound clip playback
//!
//! clipdeck opens the default audio output device, loads sound files into
//! driver-owned buffers and plays them back, optionally through an
//! environmental reverb.
//!
//! # Architecture
//!
//! The crate is split into two layers:
//! - `driver`: a small in-process audio driver with device, context, buffer,
//!   source, effect and effect-slot objects. It mixes playing sources and
//!   writes them to an output backend (`cpal`, or the silent null device).
//! - `audio`: the clip-level API built on the driver: subsystem lifecycle,
//!   clip loading, playback, tracks and reverb environments.
//!
//! Every driver object is an owned handle that releases itself on drop, so a
//! failure at any step releases exactly what was acquired before it.

pub mod audio;
pub mod cli;
pub mod config;
pub mod driver;
pub mod error;

pub use audio::{AudioSubsystem, Clip, Environment, Track, TrackEntry};
pub use config::AudioConfig;
pub use error::{AudioError, Result};
