//! Source objects

use log::debug;

use super::buffer::Buffer;
use super::context::Context;
use super::effect::EffectSlot;
use super::journal::{DriverCall, DriverEvent};
use super::{DriverError, DriverResult};

/// Playback state of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Never played, or rewound
    Initial,
    Playing,
    Paused,
    /// Stopped explicitly or reached the end of its buffer
    Stopped,
}

/// A playback voice reading from one buffer.
///
/// Deleted when dropped.
pub struct Source<'ctx> {
    context: &'ctx Context,
    name: u32,
}

impl<'ctx> Source<'ctx> {
    pub(crate) fn new(context: &'ctx Context, name: u32) -> Self {
        Self { context, name }
    }

    pub fn name(&self) -> u32 {
        self.name
    }

    /// Attach `buffer` (or detach with `None`); the source returns to `Initial`
    pub fn set_buffer(&self, buffer: Option<&Buffer<'_>>) -> DriverResult<()> {
        self.context.ensure_current()?;
        self.context.probe().check(DriverCall::SourceBuffer)?;
        let buffer_name = buffer.map(|b| b.name());
        self.context
            .mixer()
            .set_source_buffer(self.name, buffer_name)?;
        self.context.probe().record(DriverEvent::SourceBufferSet {
            source: self.name,
            buffer: buffer_name,
        });
        Ok(())
    }

    pub fn buffer(&self) -> Option<u32> {
        self.context.mixer().source_buffer(self.name)
    }

    /// Start from the beginning, or resume when paused
    pub fn play(&self) -> DriverResult<()> {
        self.context.play_sources(&[self])
    }

    pub fn pause(&self) -> DriverResult<()> {
        self.context.ensure_current()?;
        self.context.mixer().pause(self.name)
    }

    pub fn stop(&self) -> DriverResult<()> {
        self.context.ensure_current()?;
        self.context.mixer().stop(self.name)?;
        self.context.notify_stopped();
        Ok(())
    }

    pub fn rewind(&self) -> DriverResult<()> {
        self.context.ensure_current()?;
        self.context.mixer().rewind(self.name)?;
        self.context.notify_stopped();
        Ok(())
    }

    pub fn state(&self) -> SourceState {
        self.context.mixer().source_state(self.name)
    }

    pub fn is_playing(&self) -> bool {
        self.state() == SourceState::Playing
    }

    /// Read position in buffer frames
    pub fn offset_frames(&self) -> u64 {
        self.context.mixer().source_offset(self.name)
    }

    pub fn set_gain(&self, gain: f32) -> DriverResult<()> {
        self.context.ensure_current()?;
        if !gain.is_finite() || gain < 0.0 {
            return Err(DriverError::InvalidValue(format!(
                "source gain {} (expected a finite value >= 0)",
                gain
            )));
        }
        self.context.mixer().set_source_gain(self.name, gain)
    }

    pub fn gain(&self) -> f32 {
        self.context.mixer().source_gain(self.name)
    }

    /// Route the auxiliary send into `slot`, or disconnect it with `None`
    pub fn set_aux_send(&self, slot: Option<&EffectSlot<'_>>) -> DriverResult<()> {
        self.context.ensure_current()?;
        self.context.probe().check(DriverCall::SourceAuxSend)?;
        let slot_name = slot.map(|s| s.name());
        self.context
            .mixer()
            .set_source_send(self.name, slot_name)?;
        self.context.probe().record(DriverEvent::SourceAuxSendSet {
            source: self.name,
            slot: slot_name,
        });
        Ok(())
    }

    pub fn aux_send(&self) -> Option<u32> {
        self.context.mixer().source_send(self.name)
    }
}

impl Drop for Source<'_> {
    fn drop(&mut self) {
        debug!("Delete source {}", self.name);
        self.context.mixer().delete_source(self.name);
        self.context
            .probe()
            .record(DriverEvent::SourceDeleted(self.name));
        self.context.notify_stopped();
    }
}

impl std::fmt::Debug for Source<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source").field("name", &self.name).finish()
    }
}
