//! Environmental reverb
//!
//! An environment is one reverb effect loaded into one auxiliary slot.
//! Clips routed to it are heard dry plus the slot's reverb.

use log::{error, info};

use super::clip::Clip;
use crate::driver::{Context, Effect, EffectSlot, ReverbPreset, ReverbProperties};
use crate::error::{AudioError, Result};

pub struct Environment<'ctx> {
    // Slot is released before the effect it holds
    slot: EffectSlot<'ctx>,
    effect: Effect<'ctx>,
    preset: Option<ReverbPreset>,
    properties: ReverbProperties,
}

impl<'ctx> Environment<'ctx> {
    /// Generate an effect and a slot, configure the effect and load it into
    /// the slot
    pub fn create(
        context: &'ctx Context,
        properties: &ReverbProperties,
        preset: Option<ReverbPreset>,
    ) -> Result<Self> {
        let effect = context
            .gen_effect()
            .inspect_err(|e| error!("Failed to generate effect: {}", e))
            .map_err(AudioError::EffectAlloc)?;

        let slot = context
            .gen_effect_slot()
            .inspect_err(|e| error!("Failed to generate auxiliary effect slot: {}", e))
            .map_err(AudioError::EffectSlotAlloc)?;

        effect
            .set_reverb(properties)
            .inspect_err(|e| error!("Failed to configure reverb effect: {}", e))
            .map_err(AudioError::EffectConfig)?;

        slot.attach(Some(&effect))
            .inspect_err(|e| error!("Failed to attach effect to its slot: {}", e))
            .map_err(AudioError::EffectAttach)?;

        match preset {
            Some(preset) => info!("Reverb environment ready: {}", preset),
            None => info!("Reverb environment ready"),
        }
        Ok(Self {
            slot,
            effect,
            preset,
            properties: *properties,
        })
    }

    /// Feed `clip`'s auxiliary send into this environment
    pub fn route(&self, clip: &Clip<'_>) -> Result<()> {
        clip.source()
            .set_aux_send(Some(&self.slot))
            .inspect_err(|e| error!("Failed to route source to effect slot: {}", e))
            .map_err(AudioError::SendRoute)
    }

    pub fn unroute(&self, clip: &Clip<'_>) -> Result<()> {
        clip.source()
            .set_aux_send(None)
            .map_err(AudioError::SendRoute)
    }

    /// Level of the reverb return, 0 to 1
    pub fn set_gain(&self, gain: f32) -> Result<()> {
        self.slot.set_gain(gain).map_err(AudioError::EffectConfig)
    }

    pub fn gain(&self) -> f32 {
        self.slot.gain()
    }

    pub fn preset(&self) -> Option<ReverbPreset> {
        self.preset
    }

    pub fn properties(&self) -> &ReverbProperties {
        &self.properties
    }

    pub fn slot(&self) -> &EffectSlot<'ctx> {
        &self.slot
    }

    pub fn effect(&self) -> &Effect<'ctx> {
        &self.effect
    }
}

impl std::fmt::Debug for Environment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("slot", &self.slot.name())
            .field("effect", &self.effect.name())
            .field("preset", &self.preset)
            .finish()
    }
}
