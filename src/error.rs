//! Error handling for clipdeck
//!
//! Every failing step of the subsystem, clip loader and effect setup has its
//! own variant, so callers can tell exactly where an operation stopped.
//! Driver-level causes are kept as the error source.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::driver::DriverError;

/// Result type alias for clipdeck operations
pub type Result<T> = std::result::Result<T, AudioError>;

/// Main error type for clipdeck operations
#[derive(Error, Debug)]
pub enum AudioError {
    // Subsystem lifecycle
    #[error("Failed to open default audio device")]
    DeviceOpen(#[source] DriverError),

    #[error("Failed to create device context")]
    ContextCreate(#[source] DriverError),

    #[error("Failed to make context current")]
    ContextActivation(#[source] DriverError),

    // Clip loading
    #[error("Failed to generate clip buffer")]
    BufferAlloc(#[source] DriverError),

    #[error("Failed to generate clip source")]
    SourceAlloc(#[source] DriverError),

    #[error("Failed to open clip file: {path}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("Failed to allocate {requested} bytes for the decode buffer (limit {limit})")]
    OutOfMemory { requested: u128, limit: usize },

    #[error("Failed to read clip file completely: {read} of {expected} frames")]
    ShortRead { expected: u64, read: u64 },

    #[error("Failed to copy clip data to clip buffer")]
    Upload(#[source] DriverError),

    #[error("Failed to attach clip buffer to its source")]
    Bind(#[source] DriverError),

    // Playback
    #[error("Failed to play audio clip")]
    Playback(#[source] DriverError),

    #[error("Clips still playing after {waited:?}")]
    WaitTimeout { waited: Duration },

    #[error("Track entry {entry} refers to clip {clip}, but only {available} clips are loaded")]
    UnknownClip {
        entry: usize,
        clip: usize,
        available: usize,
    },

    // Environmental effects
    #[error("Failed to generate effect")]
    EffectAlloc(#[source] DriverError),

    #[error("Failed to generate auxiliary effect slot")]
    EffectSlotAlloc(#[source] DriverError),

    #[error("Failed to configure reverb effect")]
    EffectConfig(#[source] DriverError),

    #[error("Failed to attach effect to its slot")]
    EffectAttach(#[source] DriverError),

    #[error("Failed to route source to effect slot")]
    SendRoute(#[source] DriverError),

    // Configuration and I/O
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AudioError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            AudioError::DeviceOpen(_) => "DEVICE_OPEN",
            AudioError::ContextCreate(_) => "CONTEXT_CREATE",
            AudioError::ContextActivation(_) => "CONTEXT_ACTIVATION",
            AudioError::BufferAlloc(_) => "BUFFER_ALLOC",
            AudioError::SourceAlloc(_) => "SOURCE_ALLOC",
            AudioError::FileOpen { .. } => "FILE_OPEN",
            AudioError::OutOfMemory { .. } => "OUT_OF_MEMORY",
            AudioError::ShortRead { .. } => "SHORT_READ",
            AudioError::Upload(_) => "UPLOAD",
            AudioError::Bind(_) => "BIND",
            AudioError::Playback(_) => "PLAYBACK",
            AudioError::WaitTimeout { .. } => "WAIT_TIMEOUT",
            AudioError::UnknownClip { .. } => "UNKNOWN_CLIP",
            AudioError::EffectAlloc(_) => "EFFECT_ALLOC",
            AudioError::EffectSlotAlloc(_) => "EFFECT_SLOT_ALLOC",
            AudioError::EffectConfig(_) => "EFFECT_CONFIG",
            AudioError::EffectAttach(_) => "EFFECT_ATTACH",
            AudioError::SendRoute(_) => "SEND_ROUTE",
            AudioError::Config { .. } => "CONFIG",
            AudioError::Io(_) => "IO_ERROR",
        }
    }

    /// The driver error behind this failure, if there is one
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            AudioError::DeviceOpen(e)
            | AudioError::ContextCreate(e)
            | AudioError::ContextActivation(e)
            | AudioError::BufferAlloc(e)
            | AudioError::SourceAlloc(e)
            | AudioError::Upload(e)
            | AudioError::Bind(e)
            | AudioError::Playback(e)
            | AudioError::EffectAlloc(e)
            | AudioError::EffectSlotAlloc(e)
            | AudioError::EffectConfig(e)
            | AudioError::EffectAttach(e)
            | AudioError::SendRoute(e) => Some(e),
            _ => None,
        }
    }
}
