//! Audio effect stage
//!
//! A configured chain of effects applied in place to interleaved stereo
//! `f32` runs before resampling. An effect may shorten the run; the
//! shortened frame count is what the rest of the pipeline sees.

use serde::{Deserialize, Serialize};

/// In-place processor over interleaved stereo samples.
pub trait DspStage: Send {
    /// Process `frames` stereo frames of `samples` in place and return the
    /// number of valid output frames (never more than `frames`).
    fn process(&mut self, samples: &mut [f32], frames: usize) -> usize;

    fn reset(&mut self) {}
}

/// Effect description as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DspEffectConfig {
    /// Constant gain in decibels.
    Gain { db: f32 },
    /// One-pole low-pass per channel.
    LowPass { cutoff_hz: f32 },
    /// Saturating soft clip for overshooting mixes.
    SoftClip,
}

/// Ordered effect chain built from configuration.
pub struct DspChain {
    effects: Vec<Box<dyn DspStage>>,
}

impl DspChain {
    pub fn new(effects: Vec<Box<dyn DspStage>>) -> Self {
        Self { effects }
    }

    /// Build the chain for a stream at `sample_rate`. `None` if no effect is configured.
    pub fn from_config(configs: &[DspEffectConfig], sample_rate: f32) -> Option<Self> {
        if configs.is_empty() {
            return None;
        }
        let effects = configs
            .iter()
            .map(|c| -> Box<dyn DspStage> {
                match *c {
                    DspEffectConfig::Gain { db } => Box::new(Gain::from_db(db)),
                    DspEffectConfig::LowPass { cutoff_hz } => {
                        Box::new(LowPass::new(cutoff_hz, sample_rate))
                    }
                    DspEffectConfig::SoftClip => Box::new(SoftClip),
                }
            })
            .collect();
        Some(Self { effects })
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

impl DspStage for DspChain {
    fn process(&mut self, samples: &mut [f32], frames: usize) -> usize {
        let mut frames = frames;
        for effect in &mut self.effects {
            frames = effect.process(samples, frames).min(frames);
        }
        frames
    }

    fn reset(&mut self) {
        for effect in &mut self.effects {
            effect.reset();
        }
    }
}

// ============================================================================
// Effects
// ============================================================================

/// Constant gain.
#[derive(Debug, Clone, Copy)]
pub struct Gain {
    gain: f32,
}

impl Gain {
    pub fn from_db(db: f32) -> Self {
        Self {
            gain: crate::convert::db_to_gain(db),
        }
    }
}

impl DspStage for Gain {
    fn process(&mut self, samples: &mut [f32], frames: usize) -> usize {
        for s in &mut samples[..frames * 2] {
            *s *= self.gain;
        }
        frames
    }
}

/// One-pole low-pass filter, independent state per channel.
#[derive(Debug, Clone, Copy)]
pub struct LowPass {
    alpha: f32,
    state: [f32; 2],
}

impl LowPass {
    pub fn new(cutoff_hz: f32, sample_rate: f32) -> Self {
        let rc = 1.0 / (2.0 * std::f32::consts::PI * cutoff_hz.max(1.0));
        let dt = 1.0 / sample_rate.max(1.0);
        Self {
            alpha: dt / (rc + dt),
            state: [0.0; 2],
        }
    }
}

impl DspStage for LowPass {
    fn process(&mut self, samples: &mut [f32], frames: usize) -> usize {
        for frame in samples[..frames * 2].chunks_exact_mut(2) {
            for (ch, s) in frame.iter_mut().enumerate() {
                self.state[ch] += self.alpha * (*s - self.state[ch]);
                *s = self.state[ch];
            }
        }
        frames
    }

    fn reset(&mut self) {
        self.state = [0.0; 2];
    }
}

/// Tanh lookup table, t = 0.0 to 7.0 in steps of 0.25.
const TANH_LUT: [f32; 29] = [
    0.0, 0.244919, 0.462117, 0.635149, 0.761594, 0.848284, 0.905148, 0.941389, 0.964028,
    0.978034, 0.986614, 0.991815, 0.995055, 0.997109, 0.998396, 0.999198, 0.999665, 0.999892,
    0.999988, 0.999998, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0,
];

/// Soft clipper: identity inside [-1, 1], tanh knee outside it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftClip;

/// `sign(x) * (1 + tanh(|x| - 1))` for |x| > 1, via the lookup table.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    if x.abs() <= 1.0 {
        return x;
    }
    let t = (x.abs() - 1.0).min(7.0);
    let pos = t * 4.0;
    let idx = (pos as usize).min(27);
    let frac = pos - idx as f32;
    let tanh_val = TANH_LUT[idx] * (1.0 - frac) + TANH_LUT[idx + 1] * frac;
    x.signum() * (1.0 + tanh_val)
}

impl DspStage for SoftClip {
    fn process(&mut self, samples: &mut [f32], frames: usize) -> usize {
        for s in &mut samples[..frames * 2] {
            *s = soft_clip(*s);
        }
        frames
    }
}
