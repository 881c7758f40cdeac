//! Output backends
//!
//! Each backend pulls periods from the context's mixer on its own thread.

#[cfg(feature = "cpal")]
mod cpal;
mod null;

use std::sync::Arc;

use super::context::Shared;
use super::device::{Backend, Device};
use super::DriverResult;

/// A running (or paused) output stream of one context
pub(crate) enum OutputStream {
    Null(null::NullStream),
    #[cfg(feature = "cpal")]
    Cpal(self::cpal::CpalStream),
}

impl OutputStream {
    /// Build a paused stream feeding `device` from `shared`
    pub(crate) fn open(device: &Device, shared: Arc<Shared>) -> DriverResult<Self> {
        match device.backend() {
            Backend::Null => Ok(Self::Null(null::NullStream::spawn(
                device.spec(),
                device.period_frames(),
                shared,
            )?)),
            #[cfg(feature = "cpal")]
            Backend::Cpal(output) => Ok(Self::Cpal(self::cpal::CpalStream::build(
                output,
                device.spec(),
                shared,
            )?)),
        }
    }

    pub(crate) fn play(&mut self) -> DriverResult<()> {
        match self {
            Self::Null(stream) => {
                stream.play();
                Ok(())
            }
            #[cfg(feature = "cpal")]
            Self::Cpal(stream) => stream.play(),
        }
    }

    pub(crate) fn pause(&mut self) -> DriverResult<()> {
        match self {
            Self::Null(stream) => {
                stream.pause();
                Ok(())
            }
            #[cfg(feature = "cpal")]
            Self::Cpal(stream) => stream.pause(),
        }
    }
}
