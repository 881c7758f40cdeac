//! In-process audio driver
//!
//! A small object model in the style of the classic 3D audio APIs: a device
//! owns contexts, the current context owns buffers, sources, effects and
//! effect slots. Every object is a handle that deletes itself on drop and
//! borrows the context it was generated from, so a context can never be
//! destroyed while objects generated from it are alive.
//!
//! Playing sources are mixed by [`mixer::Mixer`] on the output backend's
//! thread (`cpal`, or the silent null device).

pub mod buffer;
pub mod context;
pub mod device;
pub mod effect;
pub mod format;
pub mod journal;
pub(crate) mod mixer;
pub(crate) mod output;
pub(crate) mod reverb;
pub mod source;

use thiserror::Error;

pub use buffer::Buffer;
pub use context::{Context, ContextAttributes};
pub use device::{Device, OutputSpec};
pub use effect::{Effect, EffectSlot, ReverbPreset, ReverbProperties, ReverbVoicing};
pub use format::Format;
pub use journal::{DriverCall, DriverEvent, Faults, Journal, NullDevice};
pub use source::{Source, SourceState};

/// Result type alias for driver calls
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Kinds of context-owned objects, used in limit errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Buffer,
    Source,
    Effect,
    EffectSlot,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ObjectKind::Buffer => "buffer",
            ObjectKind::Source => "source",
            ObjectKind::Effect => "effect",
            ObjectKind::EffectSlot => "effect slot",
        };
        f.write_str(name)
    }
}

/// Errors reported by driver calls
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("no context is current")]
    NoCurrentContext,

    #[error("another context is already current")]
    ContextBusy,

    #[error("{kind} limit of {max} reached")]
    LimitReached { kind: ObjectKind, max: usize },

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    #[error("{requested} bytes exceed the {limit} byte buffer limit")]
    OutOfMemory { requested: usize, limit: usize },

    #[error("driver rejected {0:?}")]
    Rejected(DriverCall),

    #[error("no default output device available")]
    NoDevice,

    #[error("{0} backend not compiled in")]
    BackendUnavailable(&'static str),

    #[error("backend error: {0}")]
    Backend(String),
}
