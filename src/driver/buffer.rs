//! Buffer objects

use log::debug;

use super::context::Context;
use super::format::Format;
use super::journal::{DriverCall, DriverEvent};
use super::mixer::PcmData;
use super::{DriverError, DriverResult};

/// A buffer holding sample data for sources to play.
///
/// Deleted when dropped.
pub struct Buffer<'ctx> {
    context: &'ctx Context,
    name: u32,
}

impl<'ctx> Buffer<'ctx> {
    pub(crate) fn new(context: &'ctx Context, name: u32) -> Self {
        Self { context, name }
    }

    pub fn name(&self) -> u32 {
        self.name
    }

    /// Replace the buffer's contents with `bytes` laid out as `format`.
    ///
    /// Fails for a zero rate, a length that is not a whole number of frames,
    /// data larger than the context's buffer limit, or while a source has
    /// this buffer attached.
    pub fn data(&self, format: Format, bytes: &[u8], sample_rate: u32) -> DriverResult<()> {
        self.context.ensure_current()?;
        self.context.probe().check(DriverCall::BufferData)?;

        if sample_rate == 0 {
            return Err(DriverError::InvalidValue(
                "sample rate must be non-zero".to_string(),
            ));
        }
        if bytes.len() % format.frame_size() != 0 {
            return Err(DriverError::InvalidValue(format!(
                "{} bytes is not a whole number of {} frames",
                bytes.len(),
                format
            )));
        }
        let limit = self.context.attributes().max_buffer_bytes;
        if bytes.len() > limit {
            return Err(DriverError::OutOfMemory {
                requested: bytes.len(),
                limit,
            });
        }

        let data = PcmData {
            samples: format.decode(bytes),
            channels: format.channels() as usize,
            sample_rate,
        };
        self.context.mixer().buffer_data(self.name, format, data)?;

        debug!(
            "Buffer {}: {} bytes of {} at {}Hz",
            self.name,
            bytes.len(),
            format,
            sample_rate
        );
        self.context.probe().record(DriverEvent::BufferData {
            buffer: self.name,
            format,
            bytes: bytes.len(),
            sample_rate,
        });
        Ok(())
    }

    /// Frames of data held, zero before the first upload
    pub fn frames(&self) -> usize {
        self.info().map(|(_, _, frames)| frames).unwrap_or(0)
    }

    pub fn format(&self) -> Option<Format> {
        self.info().map(|(format, _, _)| format)
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.info().map(|(_, rate, _)| rate)
    }

    fn info(&self) -> Option<(Format, u32, usize)> {
        self.context.mixer().buffer_info(self.name)
    }
}

impl Drop for Buffer<'_> {
    fn drop(&mut self) {
        debug!("Delete buffer {}", self.name);
        self.context.mixer().delete_buffer(self.name);
        self.context
            .probe()
            .record(DriverEvent::BufferDeleted(self.name));
    }
}

impl std::fmt::Debug for Buffer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer").field("name", &self.name).finish()
    }
}
