//! Call journal and fault injection for the null device
//!
//! A [`NullDevice`] records every object lifecycle call made through it and
//! can be told to reject specific calls, which makes the release order of
//! any failure path observable.

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;
use parking_lot::Mutex;

use super::format::Format;
use super::{DriverError, DriverResult};

/// Driver calls that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverCall {
    OpenDevice,
    CreateContext,
    MakeCurrent,
    GenBuffer,
    GenSource,
    BufferData,
    SourceBuffer,
    SourcePlay,
    GenEffect,
    GenEffectSlot,
    EffectReverb,
    SlotAttach,
    SourceAuxSend,
}

/// Something that happened to a driver object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEvent {
    DeviceOpened,
    ContextCreated,
    ContextMadeCurrent,
    BufferGenerated(u32),
    SourceGenerated(u32),
    BufferData {
        buffer: u32,
        format: Format,
        bytes: usize,
        sample_rate: u32,
    },
    SourceBufferSet {
        source: u32,
        buffer: Option<u32>,
    },
    SourcePlayed(u32),
    EffectGenerated(u32),
    EffectSlotGenerated(u32),
    EffectReverbSet(u32),
    EffectSlotAttached {
        slot: u32,
        effect: Option<u32>,
    },
    SourceAuxSendSet {
        source: u32,
        slot: Option<u32>,
    },
    EffectSlotDeleted(u32),
    EffectDeleted(u32),
    SourceDeleted(u32),
    BufferDeleted(u32),
    ContextReleased,
    ContextDestroyed,
    DeviceClosed,
}

/// Ordered list of driver events
#[derive(Debug, Default)]
pub struct Journal {
    events: Mutex<Vec<DriverEvent>>,
}

impl Journal {
    pub fn events(&self) -> Vec<DriverEvent> {
        self.events.lock().clone()
    }

    /// Events recorded after the first `skip`
    pub fn events_since(&self, skip: usize) -> Vec<DriverEvent> {
        self.events.lock().iter().skip(skip).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn push(&self, event: DriverEvent) {
        trace!("driver event: {:?}", event);
        self.events.lock().push(event);
    }
}

/// Calls the null device rejects.
///
/// Each entry counts the calls still allowed through before rejections
/// start; once at zero the call keeps failing until healed.
#[derive(Debug, Default)]
pub struct Faults {
    calls: Mutex<HashMap<DriverCall, usize>>,
}

impl Faults {
    /// Reject every future `call` until healed
    pub fn fail(&self, call: DriverCall) {
        self.fail_after(call, 0);
    }

    /// Let the next `allowed` calls succeed, then reject `call` until healed
    pub fn fail_after(&self, call: DriverCall, allowed: usize) {
        self.calls.lock().insert(call, allowed);
    }

    pub fn heal(&self, call: DriverCall) {
        self.calls.lock().remove(&call);
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn check(&self, call: DriverCall) -> DriverResult<()> {
        match self.calls.lock().get_mut(&call) {
            Some(0) => Err(DriverError::Rejected(call)),
            Some(allowed) => {
                *allowed -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Handle to a silent output device with a journal and fault switches.
///
/// Clones share the same journal and faults, so a test keeps one clone and
/// hands another to the subsystem.
#[derive(Debug, Clone, Default)]
pub struct NullDevice {
    journal: Arc<Journal>,
    faults: Arc<Faults>,
}

impl NullDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }
}

/// Hook every driver object reports through; inert on real devices
#[derive(Debug, Clone, Default)]
pub(crate) struct Probe(Option<NullDevice>);

impl Probe {
    pub(crate) fn null(device: &NullDevice) -> Self {
        Self(Some(device.clone()))
    }

    /// True when events go to a null device journal
    pub(crate) fn is_recording(&self) -> bool {
        self.0.is_some()
    }

    pub(crate) fn record(&self, event: DriverEvent) {
        if let Some(device) = &self.0 {
            device.journal.push(event);
        }
    }

    pub(crate) fn check(&self, call: DriverCall) -> DriverResult<()> {
        match &self.0 {
            Some(device) => device.faults.check(call),
            None => Ok(()),
        }
    }
}
