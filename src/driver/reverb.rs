//! Freeverb network rendered by effect slots
//!
//! - 8 parallel low-pass feedback comb filters per channel
//! - 4 series allpass filters per channel for diffusion
//! - Stereo width control
//! - Pre-delay line
//!
//! The slot bus is processed in place: stereo interleaved input in, wet-only
//! stereo out. The dry signal never passes through here.

use super::effect::{ReverbVoicing, MAX_PRE_DELAY_MS};

// ============================================================================
// Freeverb Constants
// ============================================================================

/// Reference sample rate for the tuning delays
const REFERENCE_SAMPLE_RATE: f64 = 44100.0;

/// Comb filter delays at 44100 Hz
const COMB_DELAYS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];

/// Allpass filter delays at 44100 Hz
const ALLPASS_DELAYS: [usize; 4] = [556, 441, 341, 225];

/// Extra delay of the right channel filters
const STEREO_SPREAD: usize = 23;

const ALLPASS_FEEDBACK: f32 = 0.5;

/// Input attenuation ahead of the comb bank
const FIXED_GAIN: f32 = 0.015;

const SCALE_WET: f32 = 3.0;
const SCALE_DAMP: f32 = 0.4;
const SCALE_ROOM: f32 = 0.28;
const OFFSET_ROOM: f32 = 0.7;

fn scaled(delay: usize, sample_rate: u32) -> usize {
    ((delay as f64 * sample_rate as f64 / REFERENCE_SAMPLE_RATE) as usize).max(1)
}

// ============================================================================
// Filter Components
// ============================================================================

#[derive(Debug, Clone)]
struct Comb {
    buffer: Vec<f32>,
    index: usize,
    filter_store: f32,
}

impl Comb {
    fn new(delay: usize) -> Self {
        Self {
            buffer: vec![0.0; delay],
            index: 0,
            filter_store: 0.0,
        }
    }

    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let output = self.buffer[self.index];
        self.filter_store = output * (1.0 - damp) + self.filter_store * damp;
        self.buffer[self.index] = input + self.filter_store * feedback;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }
}

#[derive(Debug, Clone)]
struct Allpass {
    buffer: Vec<f32>,
    index: usize,
}

impl Allpass {
    fn new(delay: usize) -> Self {
        Self {
            buffer: vec![0.0; delay],
            index: 0,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.index];
        self.buffer[self.index] = input + delayed * ALLPASS_FEEDBACK;
        self.index = (self.index + 1) % self.buffer.len();
        delayed - input
    }
}

/// Fixed-capacity delay line with a variable tap
#[derive(Debug, Clone)]
struct PreDelay {
    buffer: Vec<f32>,
    write: usize,
}

impl PreDelay {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(1)],
            write: 0,
        }
    }

    fn process(&mut self, input: f32, delay: usize) -> f32 {
        if delay == 0 {
            return input;
        }
        let len = self.buffer.len();
        self.buffer[self.write] = input;
        let read = (self.write + len - delay.min(len - 1)) % len;
        self.write = (self.write + 1) % len;
        self.buffer[read]
    }
}

// ============================================================================
// Freeverb
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) struct Freeverb {
    sample_rate: u32,
    comb_left: Vec<Comb>,
    comb_right: Vec<Comb>,
    allpass_left: Vec<Allpass>,
    allpass_right: Vec<Allpass>,
    pre_delay: PreDelay,
    pre_delay_samples: usize,
    feedback: f32,
    damp: f32,
    wet1: f32,
    wet2: f32,
}

impl Freeverb {
    pub(crate) fn new(sample_rate: u32, voicing: &ReverbVoicing) -> Self {
        let max_pre_delay = (MAX_PRE_DELAY_MS / 1000.0 * sample_rate as f32) as usize + 1;
        let mut reverb = Self {
            sample_rate,
            comb_left: COMB_DELAYS
                .iter()
                .map(|&d| Comb::new(scaled(d, sample_rate)))
                .collect(),
            comb_right: COMB_DELAYS
                .iter()
                .map(|&d| Comb::new(scaled(d + STEREO_SPREAD, sample_rate)))
                .collect(),
            allpass_left: ALLPASS_DELAYS
                .iter()
                .map(|&d| Allpass::new(scaled(d, sample_rate)))
                .collect(),
            allpass_right: ALLPASS_DELAYS
                .iter()
                .map(|&d| Allpass::new(scaled(d + STEREO_SPREAD, sample_rate)))
                .collect(),
            pre_delay: PreDelay::new(max_pre_delay),
            pre_delay_samples: 0,
            feedback: 0.0,
            damp: 0.0,
            wet1: 0.0,
            wet2: 0.0,
        };
        reverb.set_voicing(voicing);
        reverb
    }

    pub(crate) fn set_voicing(&mut self, voicing: &ReverbVoicing) {
        self.feedback = voicing.room_size * SCALE_ROOM + OFFSET_ROOM;
        self.damp = voicing.damping * SCALE_DAMP;

        let wet = voicing.wet * SCALE_WET;
        self.wet1 = wet * (voicing.width / 2.0 + 0.5);
        self.wet2 = wet * ((1.0 - voicing.width) / 2.0);

        self.pre_delay_samples =
            (voicing.pre_delay_ms / 1000.0 * self.sample_rate as f32) as usize;
    }

    /// Replace a stereo interleaved bus with its reverb tail
    pub(crate) fn process(&mut self, bus: &mut [f32]) {
        for frame in bus.chunks_exact_mut(2) {
            let input = (frame[0] + frame[1]) * FIXED_GAIN;
            let input = self.pre_delay.process(input, self.pre_delay_samples);

            let mut left = 0.0;
            let mut right = 0.0;
            for comb in &mut self.comb_left {
                left += comb.process(input, self.feedback, self.damp);
            }
            for comb in &mut self.comb_right {
                right += comb.process(input, self.feedback, self.damp);
            }
            for allpass in &mut self.allpass_left {
                left = allpass.process(left);
            }
            for allpass in &mut self.allpass_right {
                right = allpass.process(right);
            }

            frame[0] = left * self.wet1 + right * self.wet2;
            frame[1] = right * self.wet1 + left * self.wet2;
        }
    }
}
