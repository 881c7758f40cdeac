//! Object tables and the render loop of a context
//!
//! All state a context owns lives here behind one mutex: the API thread
//! edits it through the object handles, the output thread renders from it.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace};

use super::effect::{ReverbProperties, ReverbVoicing};
use super::format::Format;
use super::reverb::Freeverb;
use super::source::SourceState;
use super::{DriverError, DriverResult, ObjectKind};

// ============================================================================
// Object State
// ============================================================================

/// Decoded contents of a buffer, shared with the sources it is bound to
#[derive(Debug)]
pub(crate) struct PcmData {
    pub(crate) samples: Vec<f32>,
    pub(crate) channels: usize,
    pub(crate) sample_rate: u32,
}

impl PcmData {
    fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    /// Stereo sample pair at `position`, linearly interpolated
    fn frame_at(&self, position: f64) -> (f32, f32) {
        let frames = self.frames();
        let index = position as usize;
        let frac = (position - index as f64) as f32;
        let next = (index + 1).min(frames - 1);

        let read = |frame: usize| -> (f32, f32) {
            let base = frame * self.channels;
            if self.channels == 1 {
                (self.samples[base], self.samples[base])
            } else {
                (self.samples[base], self.samples[base + 1])
            }
        };

        let (l0, r0) = read(index);
        let (l1, r1) = read(next);
        (l0 + (l1 - l0) * frac, r0 + (r1 - r0) * frac)
    }
}

#[derive(Debug, Default)]
struct BufferEntry {
    format: Option<Format>,
    data: Option<Arc<PcmData>>,
}

#[derive(Debug)]
struct Voice {
    state: SourceState,
    buffer: Option<u32>,
    data: Option<Arc<PcmData>>,
    position: f64,
    gain: f32,
    send: Option<u32>,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            state: SourceState::Initial,
            buffer: None,
            data: None,
            position: 0.0,
            gain: 1.0,
            send: None,
        }
    }
}

#[derive(Debug)]
struct Slot {
    effect: Option<u32>,
    gain: f32,
    reverb: Option<Freeverb>,
    bus: Vec<f32>,
}

// ============================================================================
// Mixer
// ============================================================================

#[derive(Debug)]
pub(crate) struct Mixer {
    next_name: u32,
    output_rate: u32,
    buffers: HashMap<u32, BufferEntry>,
    sources: HashMap<u32, Voice>,
    effects: HashMap<u32, ReverbProperties>,
    slots: HashMap<u32, Slot>,
    dry: Vec<f32>,
}

impl Mixer {
    pub(crate) fn new(output_rate: u32) -> Self {
        Self {
            next_name: 1,
            output_rate,
            buffers: HashMap::new(),
            sources: HashMap::new(),
            effects: HashMap::new(),
            slots: HashMap::new(),
            dry: Vec::new(),
        }
    }

    fn allocate_name(&mut self) -> u32 {
        let name = self.next_name;
        self.next_name += 1;
        name
    }

    fn source_mut(&mut self, name: u32) -> DriverResult<&mut Voice> {
        self.sources
            .get_mut(&name)
            .ok_or_else(|| DriverError::InvalidValue(format!("no source named {}", name)))
    }

    // ------------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------------

    pub(crate) fn create_buffer(&mut self, max: usize) -> DriverResult<u32> {
        if self.buffers.len() >= max {
            return Err(DriverError::LimitReached {
                kind: ObjectKind::Buffer,
                max,
            });
        }
        let name = self.allocate_name();
        self.buffers.insert(name, BufferEntry::default());
        Ok(name)
    }

    pub(crate) fn delete_buffer(&mut self, name: u32) {
        self.buffers.remove(&name);
        for voice in self.sources.values_mut() {
            if voice.buffer == Some(name) {
                debug!("Buffer {} deleted while bound; source keeps its samples", name);
                voice.buffer = None;
            }
        }
    }

    pub(crate) fn buffer_data(
        &mut self,
        name: u32,
        format: Format,
        data: PcmData,
    ) -> DriverResult<()> {
        if self.sources.values().any(|v| v.buffer == Some(name)) {
            return Err(DriverError::InvalidOperation(
                "buffer data cannot change while attached to a source",
            ));
        }
        let entry = self
            .buffers
            .get_mut(&name)
            .ok_or_else(|| DriverError::InvalidValue(format!("no buffer named {}", name)))?;
        entry.format = Some(format);
        entry.data = Some(Arc::new(data));
        Ok(())
    }

    /// Format, rate and frame count of a buffer's data
    pub(crate) fn buffer_info(&self, name: u32) -> Option<(Format, u32, usize)> {
        let entry = self.buffers.get(&name)?;
        let format = entry.format?;
        let data = entry.data.as_ref()?;
        Some((format, data.sample_rate, data.frames()))
    }

    // ------------------------------------------------------------------------
    // Sources
    // ------------------------------------------------------------------------

    pub(crate) fn create_source(&mut self, max: usize) -> DriverResult<u32> {
        if self.sources.len() >= max {
            return Err(DriverError::LimitReached {
                kind: ObjectKind::Source,
                max,
            });
        }
        let name = self.allocate_name();
        self.sources.insert(name, Voice::default());
        Ok(name)
    }

    pub(crate) fn delete_source(&mut self, name: u32) {
        self.sources.remove(&name);
    }

    pub(crate) fn set_source_buffer(&mut self, name: u32, buffer: Option<u32>) -> DriverResult<()> {
        let data = match buffer {
            Some(b) => {
                let entry = self.buffers.get(&b).ok_or_else(|| {
                    DriverError::InvalidValue(format!("no buffer named {}", b))
                })?;
                entry.data.clone()
            }
            None => None,
        };

        let voice = self.source_mut(name)?;
        if matches!(voice.state, SourceState::Playing | SourceState::Paused) {
            return Err(DriverError::InvalidOperation(
                "cannot change the buffer of a playing or paused source",
            ));
        }
        voice.buffer = buffer;
        voice.data = data;
        voice.position = 0.0;
        voice.state = SourceState::Initial;
        Ok(())
    }

    pub(crate) fn source_buffer(&self, name: u32) -> Option<u32> {
        self.sources.get(&name).and_then(|v| v.buffer)
    }

    /// Start every named source; nothing changes if one name is unknown
    pub(crate) fn play(&mut self, names: &[u32]) -> DriverResult<()> {
        if let Some(missing) = names.iter().find(|n| !self.sources.contains_key(n)) {
            return Err(DriverError::InvalidValue(format!(
                "no source named {}",
                missing
            )));
        }
        for name in names {
            let voice = self.source_mut(*name)?;
            if voice.state != SourceState::Paused {
                voice.position = 0.0;
            }
            voice.state = SourceState::Playing;
            trace!("source {} playing", name);
        }
        Ok(())
    }

    pub(crate) fn pause(&mut self, name: u32) -> DriverResult<()> {
        let voice = self.source_mut(name)?;
        if voice.state == SourceState::Playing {
            voice.state = SourceState::Paused;
        }
        Ok(())
    }

    pub(crate) fn stop(&mut self, name: u32) -> DriverResult<()> {
        let voice = self.source_mut(name)?;
        if voice.state != SourceState::Initial {
            voice.state = SourceState::Stopped;
        }
        voice.position = 0.0;
        Ok(())
    }

    pub(crate) fn rewind(&mut self, name: u32) -> DriverResult<()> {
        let voice = self.source_mut(name)?;
        voice.state = SourceState::Initial;
        voice.position = 0.0;
        Ok(())
    }

    pub(crate) fn source_state(&self, name: u32) -> SourceState {
        self.sources
            .get(&name)
            .map(|v| v.state)
            .unwrap_or(SourceState::Initial)
    }

    pub(crate) fn source_offset(&self, name: u32) -> u64 {
        self.sources
            .get(&name)
            .map(|v| v.position as u64)
            .unwrap_or(0)
    }

    pub(crate) fn set_source_gain(&mut self, name: u32, gain: f32) -> DriverResult<()> {
        self.source_mut(name)?.gain = gain;
        Ok(())
    }

    pub(crate) fn source_gain(&self, name: u32) -> f32 {
        self.sources.get(&name).map(|v| v.gain).unwrap_or(0.0)
    }

    pub(crate) fn set_source_send(&mut self, name: u32, slot: Option<u32>) -> DriverResult<()> {
        if let Some(s) = slot {
            if !self.slots.contains_key(&s) {
                return Err(DriverError::InvalidValue(format!(
                    "no effect slot named {}",
                    s
                )));
            }
        }
        self.source_mut(name)?.send = slot;
        Ok(())
    }

    pub(crate) fn source_send(&self, name: u32) -> Option<u32> {
        self.sources.get(&name).and_then(|v| v.send)
    }

    /// True once none of `names` is playing
    pub(crate) fn all_stopped(&self, names: &[u32]) -> bool {
        names
            .iter()
            .all(|n| self.source_state(*n) != SourceState::Playing)
    }

    // ------------------------------------------------------------------------
    // Effects and Slots
    // ------------------------------------------------------------------------

    pub(crate) fn create_effect(&mut self, max: usize) -> DriverResult<u32> {
        if self.effects.len() >= max {
            return Err(DriverError::LimitReached {
                kind: ObjectKind::Effect,
                max,
            });
        }
        let name = self.allocate_name();
        self.effects.insert(name, ReverbProperties::default());
        Ok(name)
    }

    pub(crate) fn delete_effect(&mut self, name: u32) {
        self.effects.remove(&name);
    }

    pub(crate) fn set_effect_properties(
        &mut self,
        name: u32,
        properties: ReverbProperties,
    ) -> DriverResult<()> {
        let entry = self
            .effects
            .get_mut(&name)
            .ok_or_else(|| DriverError::InvalidValue(format!("no effect named {}", name)))?;
        *entry = properties;
        Ok(())
    }

    pub(crate) fn effect_properties(&self, name: u32) -> Option<ReverbProperties> {
        self.effects.get(&name).copied()
    }

    pub(crate) fn create_slot(&mut self, max: usize) -> DriverResult<u32> {
        if self.slots.len() >= max {
            return Err(DriverError::LimitReached {
                kind: ObjectKind::EffectSlot,
                max,
            });
        }
        let name = self.allocate_name();
        self.slots.insert(
            name,
            Slot {
                effect: None,
                gain: 1.0,
                reverb: None,
                bus: Vec::new(),
            },
        );
        Ok(name)
    }

    pub(crate) fn delete_slot(&mut self, name: u32) {
        self.slots.remove(&name);
        for voice in self.sources.values_mut() {
            if voice.send == Some(name) {
                voice.send = None;
            }
        }
    }

    pub(crate) fn attach_effect(&mut self, slot: u32, effect: Option<u32>) -> DriverResult<()> {
        let reverb = match effect {
            Some(e) => {
                let properties = self.effects.get(&e).ok_or_else(|| {
                    DriverError::InvalidValue(format!("no effect named {}", e))
                })?;
                Some(Freeverb::new(
                    self.output_rate,
                    &ReverbVoicing::from(properties),
                ))
            }
            None => None,
        };
        let entry = self
            .slots
            .get_mut(&slot)
            .ok_or_else(|| DriverError::InvalidValue(format!("no effect slot named {}", slot)))?;
        entry.effect = effect;
        entry.reverb = reverb;
        Ok(())
    }

    pub(crate) fn slot_effect(&self, slot: u32) -> Option<u32> {
        self.slots.get(&slot).and_then(|s| s.effect)
    }

    pub(crate) fn set_slot_gain(&mut self, slot: u32, gain: f32) -> DriverResult<()> {
        let entry = self
            .slots
            .get_mut(&slot)
            .ok_or_else(|| DriverError::InvalidValue(format!("no effect slot named {}", slot)))?;
        entry.gain = gain;
        Ok(())
    }

    pub(crate) fn slot_gain(&self, slot: u32) -> Option<f32> {
        self.slots.get(&slot).map(|s| s.gain)
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// Mix one period into `out` (interleaved, `channels` wide).
    ///
    /// Returns true when at least one source reached its end.
    pub(crate) fn render(&mut self, out: &mut [f32], channels: usize) -> bool {
        let channels = channels.max(1);
        let frames = out.len() / channels;
        let output_rate = self.output_rate as f64;

        self.dry.clear();
        self.dry.resize(frames * 2, 0.0);
        for slot in self.slots.values_mut() {
            slot.bus.clear();
            slot.bus.resize(frames * 2, 0.0);
        }

        let mut any_stopped = false;
        for (name, voice) in self.sources.iter_mut() {
            if voice.state != SourceState::Playing {
                continue;
            }
            let Some(data) = voice.data.as_ref() else {
                voice.state = SourceState::Stopped;
                any_stopped = true;
                continue;
            };

            let length = data.frames() as f64;
            let step = data.sample_rate as f64 / output_rate;
            let mut send_bus = voice
                .send
                .and_then(|s| self.slots.get_mut(&s))
                .filter(|slot| slot.reverb.is_some())
                .map(|slot| &mut slot.bus);

            for frame in 0..frames {
                if voice.position >= length {
                    break;
                }
                let (left, right) = data.frame_at(voice.position);
                let (left, right) = (left * voice.gain, right * voice.gain);

                self.dry[frame * 2] += left;
                self.dry[frame * 2 + 1] += right;
                if let Some(bus) = send_bus.as_mut() {
                    bus[frame * 2] += left;
                    bus[frame * 2 + 1] += right;
                }
                voice.position += step;
            }

            if voice.position >= length {
                trace!("source {} reached its end", name);
                voice.state = SourceState::Stopped;
                voice.position = 0.0;
                any_stopped = true;
            }
        }

        for slot in self.slots.values_mut() {
            if let Some(reverb) = slot.reverb.as_mut() {
                reverb.process(&mut slot.bus);
                for (dry, wet) in self.dry.iter_mut().zip(&slot.bus) {
                    *dry += wet * slot.gain;
                }
            }
        }

        for (frame, out_frame) in out.chunks_exact_mut(channels).enumerate() {
            let left = self.dry[frame * 2];
            let right = self.dry[frame * 2 + 1];
            if channels == 1 {
                out_frame[0] = (left + right) * 0.5;
            } else {
                out_frame[0] = left;
                out_frame[1] = right;
                out_frame[2..].fill(0.0);
            }
        }

        any_stopped
    }
}
