//! Effects extension: reverb effects and auxiliary effect slots
//!
//! An [`Effect`] only stores parameters. Attaching it to an [`EffectSlot`]
//! copies those parameters into the slot, which owns the running reverb;
//! sources feed a slot through their auxiliary send.

use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use super::context::Context;
use super::journal::{DriverCall, DriverEvent};
use super::{DriverError, DriverResult};

// ============================================================================
// Reverb Properties
// ============================================================================

/// Full parameter set of the EAX reverb effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReverbProperties {
    pub density: f32,
    pub diffusion: f32,
    pub gain: f32,
    pub gain_hf: f32,
    pub gain_lf: f32,
    /// Seconds
    pub decay_time: f32,
    pub decay_hf_ratio: f32,
    pub decay_lf_ratio: f32,
    pub reflections_gain: f32,
    /// Seconds
    pub reflections_delay: f32,
    pub reflections_pan: [f32; 3],
    pub late_reverb_gain: f32,
    /// Seconds
    pub late_reverb_delay: f32,
    pub late_reverb_pan: [f32; 3],
    pub echo_time: f32,
    pub echo_depth: f32,
    pub modulation_time: f32,
    pub modulation_depth: f32,
    pub air_absorption_gain_hf: f32,
    /// Hz
    pub hf_reference: f32,
    /// Hz
    pub lf_reference: f32,
    pub room_rolloff_factor: f32,
    pub decay_hf_limit: bool,
}

impl Default for ReverbProperties {
    fn default() -> Self {
        ReverbPreset::Generic.properties()
    }
}

fn check_range(name: &str, value: f32, min: f32, max: f32) -> DriverResult<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(DriverError::InvalidValue(format!(
            "{} = {} (expected {} to {})",
            name, value, min, max
        )))
    }
}

fn check_pan(name: &str, pan: [f32; 3]) -> DriverResult<()> {
    let magnitude = pan.iter().map(|v| v * v).sum::<f32>().sqrt();
    if magnitude.is_finite() && magnitude <= 1.0 + f32::EPSILON {
        Ok(())
    } else {
        Err(DriverError::InvalidValue(format!(
            "{} has magnitude {} (expected at most 1)",
            name, magnitude
        )))
    }
}

impl ReverbProperties {
    /// Check every field against the EAX reverb ranges
    pub fn validate(&self) -> DriverResult<()> {
        check_range("density", self.density, 0.0, 1.0)?;
        check_range("diffusion", self.diffusion, 0.0, 1.0)?;
        check_range("gain", self.gain, 0.0, 1.0)?;
        check_range("gain_hf", self.gain_hf, 0.0, 1.0)?;
        check_range("gain_lf", self.gain_lf, 0.0, 1.0)?;
        check_range("decay_time", self.decay_time, 0.1, 20.0)?;
        check_range("decay_hf_ratio", self.decay_hf_ratio, 0.1, 2.0)?;
        check_range("decay_lf_ratio", self.decay_lf_ratio, 0.1, 2.0)?;
        check_range("reflections_gain", self.reflections_gain, 0.0, 3.16)?;
        check_range("reflections_delay", self.reflections_delay, 0.0, 0.3)?;
        check_pan("reflections_pan", self.reflections_pan)?;
        check_range("late_reverb_gain", self.late_reverb_gain, 0.0, 10.0)?;
        check_range("late_reverb_delay", self.late_reverb_delay, 0.0, 0.1)?;
        check_pan("late_reverb_pan", self.late_reverb_pan)?;
        check_range("echo_time", self.echo_time, 0.075, 0.25)?;
        check_range("echo_depth", self.echo_depth, 0.0, 1.0)?;
        check_range("modulation_time", self.modulation_time, 0.04, 4.0)?;
        check_range("modulation_depth", self.modulation_depth, 0.0, 1.0)?;
        check_range(
            "air_absorption_gain_hf",
            self.air_absorption_gain_hf,
            0.892,
            1.0,
        )?;
        check_range("hf_reference", self.hf_reference, 1000.0, 20000.0)?;
        check_range("lf_reference", self.lf_reference, 20.0, 1000.0)?;
        check_range("room_rolloff_factor", self.room_rolloff_factor, 0.0, 10.0)?;
        Ok(())
    }
}

// ============================================================================
// Presets
// ============================================================================

/// Named environments from the standard EFX preset table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReverbPreset {
    Generic,
    PaddedCell,
    Room,
    Bathroom,
    Auditorium,
    ConcertHall,
    Cave,
    Arena,
    Hangar,
    Hallway,
    Underwater,
}

/// Compact preset row: density, diffusion, gain, gain_hf, decay_time,
/// decay_hf_ratio, reflections_gain, reflections_delay, late_reverb_gain,
/// late_reverb_delay, modulation_time, modulation_depth, decay_hf_limit.
/// The remaining fields are identical across these presets.
type PresetRow = (f32, f32, f32, f32, f32, f32, f32, f32, f32, f32, f32, f32, bool);

impl ReverbPreset {
    pub const ALL: [ReverbPreset; 11] = [
        ReverbPreset::Generic,
        ReverbPreset::PaddedCell,
        ReverbPreset::Room,
        ReverbPreset::Bathroom,
        ReverbPreset::Auditorium,
        ReverbPreset::ConcertHall,
        ReverbPreset::Cave,
        ReverbPreset::Arena,
        ReverbPreset::Hangar,
        ReverbPreset::Hallway,
        ReverbPreset::Underwater,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ReverbPreset::Generic => "generic",
            ReverbPreset::PaddedCell => "padded_cell",
            ReverbPreset::Room => "room",
            ReverbPreset::Bathroom => "bathroom",
            ReverbPreset::Auditorium => "auditorium",
            ReverbPreset::ConcertHall => "concert_hall",
            ReverbPreset::Cave => "cave",
            ReverbPreset::Arena => "arena",
            ReverbPreset::Hangar => "hangar",
            ReverbPreset::Hallway => "hallway",
            ReverbPreset::Underwater => "underwater",
        }
    }

    fn row(self) -> PresetRow {
        match self {
            ReverbPreset::Generic => (
                1.0, 1.0, 0.3162, 0.8913, 1.49, 0.83, 0.05, 0.007, 1.2589, 0.011, 0.25, 0.0, true,
            ),
            ReverbPreset::PaddedCell => (
                0.1715, 1.0, 0.3162, 0.001, 0.17, 0.1, 0.25, 0.001, 1.2691, 0.002, 0.25, 0.0, true,
            ),
            ReverbPreset::Room => (
                0.4287, 1.0, 0.3162, 0.5929, 0.4, 0.83, 0.1503, 0.002, 1.0629, 0.003, 0.25, 0.0,
                true,
            ),
            ReverbPreset::Bathroom => (
                0.1715, 1.0, 0.3162, 0.2512, 1.49, 0.54, 0.6531, 0.007, 3.2734, 0.011, 0.25, 0.0,
                true,
            ),
            ReverbPreset::Auditorium => (
                1.0, 1.0, 0.3162, 0.5781, 4.32, 0.59, 0.4032, 0.02, 0.717, 0.03, 0.25, 0.0, true,
            ),
            ReverbPreset::ConcertHall => (
                1.0, 1.0, 0.3162, 0.5623, 3.92, 0.7, 0.2427, 0.02, 0.9977, 0.029, 0.25, 0.0, true,
            ),
            ReverbPreset::Cave => (
                1.0, 1.0, 0.3162, 1.0, 2.91, 1.3, 0.5, 0.015, 0.7063, 0.022, 0.25, 0.0, false,
            ),
            ReverbPreset::Arena => (
                1.0, 1.0, 0.3162, 0.4477, 7.24, 0.33, 0.2612, 0.02, 1.0186, 0.03, 0.25, 0.0, true,
            ),
            ReverbPreset::Hangar => (
                1.0, 1.0, 0.3162, 0.3162, 10.05, 0.23, 0.5, 0.02, 1.256, 0.03, 0.25, 0.0, true,
            ),
            ReverbPreset::Hallway => (
                0.3645, 1.0, 0.3162, 0.7079, 1.49, 0.59, 0.2458, 0.007, 1.6615, 0.011, 0.25, 0.0,
                true,
            ),
            ReverbPreset::Underwater => (
                0.3645, 1.0, 0.3162, 0.01, 1.49, 0.1, 0.5963, 0.007, 7.0795, 0.011, 1.18, 0.348,
                true,
            ),
        }
    }

    pub fn properties(self) -> ReverbProperties {
        let (
            density,
            diffusion,
            gain,
            gain_hf,
            decay_time,
            decay_hf_ratio,
            reflections_gain,
            reflections_delay,
            late_reverb_gain,
            late_reverb_delay,
            modulation_time,
            modulation_depth,
            decay_hf_limit,
        ) = self.row();

        ReverbProperties {
            density,
            diffusion,
            gain,
            gain_hf,
            gain_lf: 1.0,
            decay_time,
            decay_hf_ratio,
            decay_lf_ratio: 1.0,
            reflections_gain,
            reflections_delay,
            reflections_pan: [0.0; 3],
            late_reverb_gain,
            late_reverb_delay,
            late_reverb_pan: [0.0; 3],
            echo_time: 0.25,
            echo_depth: 0.0,
            modulation_time,
            modulation_depth,
            air_absorption_gain_hf: 0.9943,
            hf_reference: 5000.0,
            lf_reference: 250.0,
            room_rolloff_factor: 0.0,
            decay_hf_limit,
        }
    }
}

impl std::fmt::Display for ReverbPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReverbPreset {
    type Err = String;

    /// Case-insensitive; `_`, `-` and spaces are ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        ReverbPreset::ALL
            .iter()
            .copied()
            .find(|preset| preset.name().replace('_', "") == wanted)
            .ok_or_else(|| format!("unknown reverb preset '{}'", s))
    }
}

// ============================================================================
// Voicing
// ============================================================================

/// Longest pre-delay the reverb network supports
pub const MAX_PRE_DELAY_MS: f32 = 100.0;

/// Parameters of the comb/allpass network that renders a reverb
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbVoicing {
    /// 0 (tiny) to 1 (huge)
    pub room_size: f32,
    /// 0 (bright) to 1 (dark)
    pub damping: f32,
    /// 0 to 1
    pub wet: f32,
    /// 0 (mono) to 1 (full stereo)
    pub width: f32,
    pub pre_delay_ms: f32,
}

impl From<&ReverbProperties> for ReverbVoicing {
    fn from(props: &ReverbProperties) -> Self {
        // Decay times span 0.1 s to 20 s; map them logarithmically onto 0..1
        let room_size = ((props.decay_time / 0.1).ln() / 200f32.ln()).clamp(0.0, 1.0);
        let damping = (1.0 - props.decay_hf_ratio / 2.0).clamp(0.0, 1.0);
        let wet = (props.gain * props.late_reverb_gain).clamp(0.0, 1.0);
        let pre_delay_ms = ((props.reflections_delay + props.late_reverb_delay) * 1000.0)
            .clamp(0.0, MAX_PRE_DELAY_MS);

        Self {
            room_size,
            damping,
            wet,
            width: props.diffusion.clamp(0.0, 1.0),
            pre_delay_ms,
        }
    }
}

// ============================================================================
// Driver Objects
// ============================================================================

/// An effect object holding reverb parameters
pub struct Effect<'ctx> {
    context: &'ctx Context,
    name: u32,
}

impl<'ctx> Effect<'ctx> {
    pub(crate) fn new(context: &'ctx Context, name: u32) -> Self {
        Self { context, name }
    }

    pub fn name(&self) -> u32 {
        self.name
    }

    /// Replace the effect's reverb parameters
    pub fn set_reverb(&self, properties: &ReverbProperties) -> DriverResult<()> {
        self.context.ensure_current()?;
        self.context.probe().check(DriverCall::EffectReverb)?;
        properties.validate()?;
        self.context
            .mixer()
            .set_effect_properties(self.name, *properties)?;
        self.context
            .probe()
            .record(DriverEvent::EffectReverbSet(self.name));
        Ok(())
    }

    pub fn reverb(&self) -> Option<ReverbProperties> {
        self.context.mixer().effect_properties(self.name)
    }
}

impl Drop for Effect<'_> {
    fn drop(&mut self) {
        debug!("Delete effect {}", self.name);
        self.context.mixer().delete_effect(self.name);
        self.context
            .probe()
            .record(DriverEvent::EffectDeleted(self.name));
    }
}

/// An auxiliary effect slot that renders an attached effect
pub struct EffectSlot<'ctx> {
    context: &'ctx Context,
    name: u32,
}

impl<'ctx> EffectSlot<'ctx> {
    pub(crate) fn new(context: &'ctx Context, name: u32) -> Self {
        Self { context, name }
    }

    pub fn name(&self) -> u32 {
        self.name
    }

    /// Load `effect`'s current parameters into the slot, or empty it.
    ///
    /// Later changes to the effect need another `attach` to take hold.
    pub fn attach(&self, effect: Option<&Effect<'_>>) -> DriverResult<()> {
        self.context.ensure_current()?;
        self.context.probe().check(DriverCall::SlotAttach)?;
        let effect_name = effect.map(|e| e.name);
        self.context.mixer().attach_effect(self.name, effect_name)?;
        self.context.probe().record(DriverEvent::EffectSlotAttached {
            slot: self.name,
            effect: effect_name,
        });
        Ok(())
    }

    /// Name of the attached effect
    pub fn effect(&self) -> Option<u32> {
        self.context.mixer().slot_effect(self.name)
    }

    pub fn set_gain(&self, gain: f32) -> DriverResult<()> {
        self.context.ensure_current()?;
        if !gain.is_finite() || !(0.0..=1.0).contains(&gain) {
            return Err(DriverError::InvalidValue(format!(
                "slot gain {} (expected 0 to 1)",
                gain
            )));
        }
        self.context.mixer().set_slot_gain(self.name, gain)
    }

    pub fn gain(&self) -> f32 {
        self.context.mixer().slot_gain(self.name).unwrap_or(0.0)
    }
}

impl Drop for EffectSlot<'_> {
    fn drop(&mut self) {
        debug!("Delete effect slot {}", self.name);
        self.context.mixer().delete_slot(self.name);
        self.context
            .probe()
            .record(DriverEvent::EffectSlotDeleted(self.name));
    }
}

impl std::fmt::Debug for Effect<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect").field("name", &self.name).finish()
    }
}

impl std::fmt::Debug for EffectSlot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectSlot").field("name", &self.name).finish()
    }
}
