//! Rendering contexts
//!
//! A context owns the mixer and the output stream of one device. At most one
//! context per process is current; objects can only be generated (and most
//! object calls only succeed) while their context is current.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

use super::buffer::Buffer;
use super::device::{Device, OutputSpec};
use super::effect::{Effect, EffectSlot};
use super::journal::{DriverCall, DriverEvent, Probe};
use super::mixer::Mixer;
use super::output::OutputStream;
use super::source::Source;
use super::{DriverError, DriverResult};

/// Id of the current context, 0 when none is current
static CURRENT: AtomicU64 = AtomicU64::new(0);

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// Attributes
// ============================================================================

/// Object limits of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextAttributes {
    pub max_sources: usize,
    pub max_buffers: usize,
    pub max_effects: usize,
    pub max_effect_slots: usize,
    /// Largest byte count a single buffer upload may carry
    pub max_buffer_bytes: usize,
}

impl Default for ContextAttributes {
    fn default() -> Self {
        Self {
            max_sources: 256,
            max_buffers: 1024,
            max_effects: 16,
            max_effect_slots: 4,
            max_buffer_bytes: 512 * 1024 * 1024,
        }
    }
}

// ============================================================================
// Shared State
// ============================================================================

/// State shared between the context and its output thread
pub(crate) struct Shared {
    mixer: Mutex<Mixer>,
    /// Signalled whenever a source leaves `Playing` on its own
    stopped: Condvar,
}

impl Shared {
    /// Output callback body
    pub(crate) fn render(&self, out: &mut [f32], channels: usize) {
        let any_stopped = self.mixer.lock().render(out, channels);
        if any_stopped {
            self.stopped.notify_all();
        }
    }
}

// ============================================================================
// Context
// ============================================================================

pub struct Context {
    id: u64,
    shared: Arc<Shared>,
    stream: Mutex<Option<OutputStream>>,
    attributes: ContextAttributes,
    device: Device,
}

impl Context {
    /// Create a context on `device`; its output stays idle until made current
    pub fn create(device: &Device, attributes: ContextAttributes) -> DriverResult<Self> {
        device.probe().check(DriverCall::CreateContext)?;

        let spec = device.spec();
        let shared = Arc::new(Shared {
            mixer: Mutex::new(Mixer::new(spec.sample_rate)),
            stopped: Condvar::new(),
        });
        let stream = OutputStream::open(device, Arc::clone(&shared))?;
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);

        debug!("Created context {} on '{}'", id, device.name());
        device.probe().record(DriverEvent::ContextCreated);
        Ok(Self {
            id,
            shared,
            stream: Mutex::new(Some(stream)),
            attributes,
            device: device.clone(),
        })
    }

    /// Claim the process-wide current slot and start rendering
    pub fn make_current(&self) -> DriverResult<()> {
        self.probe().check(DriverCall::MakeCurrent)?;

        match CURRENT.compare_exchange(0, self.id, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => {}
            Err(current) if current == self.id => return Ok(()),
            Err(_) => return Err(DriverError::ContextBusy),
        }

        let started = match self.stream.lock().as_mut() {
            Some(stream) => stream.play(),
            None => Err(DriverError::InvalidOperation("context has no output stream")),
        };
        if let Err(e) = started {
            CURRENT.store(0, Ordering::Release);
            return Err(e);
        }

        debug!("Context {} is current", self.id);
        self.probe().record(DriverEvent::ContextMadeCurrent);
        Ok(())
    }

    /// Pause rendering and free the current slot.
    ///
    /// Returns false when this context was not current.
    pub fn release_current(&self) -> bool {
        if CURRENT
            .compare_exchange(self.id, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        if let Some(stream) = self.stream.lock().as_mut() {
            if let Err(e) = stream.pause() {
                warn!("Failed to pause output of context {}: {}", self.id, e);
            }
        }

        debug!("Context {} released", self.id);
        self.probe().record(DriverEvent::ContextReleased);
        true
    }

    pub fn is_current(&self) -> bool {
        CURRENT.load(Ordering::Acquire) == self.id
    }

    pub(crate) fn ensure_current(&self) -> DriverResult<()> {
        if self.is_current() {
            Ok(())
        } else {
            Err(DriverError::NoCurrentContext)
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn output_spec(&self) -> OutputSpec {
        self.device.spec()
    }

    pub fn attributes(&self) -> &ContextAttributes {
        &self.attributes
    }

    pub(crate) fn probe(&self) -> &Probe {
        self.device.probe()
    }

    pub(crate) fn mixer(&self) -> MutexGuard<'_, Mixer> {
        self.shared.mixer.lock()
    }

    pub(crate) fn notify_stopped(&self) {
        self.shared.stopped.notify_all();
    }

    // ------------------------------------------------------------------------
    // Object generation
    // ------------------------------------------------------------------------

    pub fn gen_buffer(&self) -> DriverResult<Buffer<'_>> {
        self.ensure_current()?;
        self.probe().check(DriverCall::GenBuffer)?;
        let name = self.mixer().create_buffer(self.attributes.max_buffers)?;
        self.probe().record(DriverEvent::BufferGenerated(name));
        Ok(Buffer::new(self, name))
    }

    pub fn gen_source(&self) -> DriverResult<Source<'_>> {
        self.ensure_current()?;
        self.probe().check(DriverCall::GenSource)?;
        let name = self.mixer().create_source(self.attributes.max_sources)?;
        self.probe().record(DriverEvent::SourceGenerated(name));
        Ok(Source::new(self, name))
    }

    pub fn gen_effect(&self) -> DriverResult<Effect<'_>> {
        self.ensure_current()?;
        self.probe().check(DriverCall::GenEffect)?;
        let name = self.mixer().create_effect(self.attributes.max_effects)?;
        self.probe().record(DriverEvent::EffectGenerated(name));
        Ok(Effect::new(self, name))
    }

    pub fn gen_effect_slot(&self) -> DriverResult<EffectSlot<'_>> {
        self.ensure_current()?;
        self.probe().check(DriverCall::GenEffectSlot)?;
        let name = self.mixer().create_slot(self.attributes.max_effect_slots)?;
        self.probe().record(DriverEvent::EffectSlotGenerated(name));
        Ok(EffectSlot::new(self, name))
    }

    // ------------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------------

    /// Start all `sources` under one mixer lock, so they begin on the same
    /// output frame. Either all of them start or none does.
    pub fn play_sources(&self, sources: &[&Source<'_>]) -> DriverResult<()> {
        self.ensure_current()?;
        self.probe().check(DriverCall::SourcePlay)?;

        let names: Vec<u32> = sources.iter().map(|s| s.name()).collect();
        self.mixer().play(&names)?;
        for name in names {
            self.probe().record(DriverEvent::SourcePlayed(name));
        }
        Ok(())
    }

    /// Block until none of `sources` is playing, or `timeout` passes.
    ///
    /// Returns true when every source stopped in time.
    pub fn wait_until_stopped(&self, sources: &[&Source<'_>], timeout: Duration) -> bool {
        let names: Vec<u32> = sources.iter().map(|s| s.name()).collect();
        let deadline = Instant::now() + timeout;

        let mut mixer = self.shared.mixer.lock();
        loop {
            if mixer.all_stopped(&names) {
                return true;
            }
            if self
                .shared
                .stopped
                .wait_until(&mut mixer, deadline)
                .timed_out()
            {
                return mixer.all_stopped(&names);
            }
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.release_current();
        // Joins the output thread before the mixer goes away
        drop(self.stream.lock().take());
        debug!("Destroyed context {}", self.id);
        self.probe().record(DriverEvent::ContextDestroyed);
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("device", &self.device)
            .field("current", &self.is_current())
            .finish()
    }
}
