//! Audio pipeline
//!
//! Core samples arrive one pair at a time or in batches. Pairs are staged
//! until a chunk is full. Every flush then runs:
//!
//! ```text
//! recorder tee -> s16 to f32 (volume) -> DSP -> rate control / slow motion
//!              -> resample -> f32 to s16 (if needed) -> sink
//! ```
//!
//! During a rewind step the same callbacks capture into the session's
//! rewind buffer instead, and the captured step is flushed in one go when
//! the step ends.

pub mod ring_sink;


use retrolink_shared::{
    AUDIO_BATCH_MAX_FRAMES, AUDIO_CHUNK_SIZE_BLOCKING, AUDIO_CHUNK_SIZE_NONBLOCKING,
    AUDIO_MAX_RATIO, DEFAULT_OUTPUT_RATE,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::convert::{db_to_gain, float_to_s16, s16_to_float};
use crate::dsp::{DspChain, DspEffectConfig, DspStage};
use crate::error::AudioError;
use crate::perf::{PerfCounters, Stage};
use crate::resampler::{LinearResampler, ResampleRequest, Resampler, max_output_frames};
use crate::session::{SessionContext, SessionFlags};
use crate::sinks::{AudioBuffer, AudioSink, Collaborators};

/// Audio configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Device sample rate in Hz.
    #[serde(default = "default_output_rate")]
    pub output_rate: u32,

    #[serde(default)]
    pub volume_db: f32,

    #[serde(default)]
    pub mute: bool,

    /// Blocking writes; selects the smaller staging chunk.
    #[serde(default = "default_true")]
    pub sync: bool,

    /// Nudge the resampling ratio by sink fill level.
    #[serde(default)]
    pub rate_control: bool,

    #[serde(default = "default_rate_control_delta")]
    pub rate_control_delta: f64,

    /// Largest relative mismatch between core fps and display refresh that
    /// is still corrected by scaling the input rate.
    #[serde(default = "default_max_timing_skew")]
    pub max_timing_skew: f64,

    /// Effects applied in order before resampling.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dsp: Vec<DspEffectConfig>,

    /// Hand `f32` samples to sinks that accept them.
    #[serde(default = "default_true")]
    pub use_float: bool,
}

fn default_output_rate() -> u32 {
    DEFAULT_OUTPUT_RATE
}
fn default_true() -> bool {
    true
}
fn default_rate_control_delta() -> f64 {
    0.005
}
fn default_max_timing_skew() -> f64 {
    0.05
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            output_rate: default_output_rate(),
            volume_db: 0.0,
            mute: false,
            sync: true,
            rate_control: false,
            rate_control_delta: default_rate_control_delta(),
            max_timing_skew: default_max_timing_skew(),
            dsp: Vec::new(),
            use_float: true,
        }
    }
}

/// Core input rate after pacing it to the display.
///
/// When the display refresh is close enough to the core's frame rate, the
/// input rate is scaled so one video frame's audio lasts exactly one
/// refresh. Otherwise the core's nominal rate is used.
pub fn adjusted_input_rate(sample_rate: f64, core_fps: f64, refresh_rate: f64, max_skew: f64) -> f64 {
    if core_fps <= 0.0 || refresh_rate <= 0.0 {
        return sample_rate;
    }
    let skew = (1.0 - core_fps / refresh_rate).abs();
    if skew > max_skew {
        info!(
            "core timing ({:.3} fps) deviates {:.1}% from display ({:.3} Hz), not adjusting audio rate",
            core_fps,
            skew * 100.0,
            refresh_rate
        );
        return sample_rate;
    }
    sample_rate * refresh_rate / core_fps
}

/// Audio pipeline
pub struct AudioPipeline {
    output_rate: f64,
    input_rate: f64,
    gain: f32,
    use_float: bool,
    rate_control: bool,
    rate_control_delta: f64,
    slowmotion_ratio: f64,
    /// Staging chunk length in samples.
    chunk_size: usize,
    staging: Vec<i16>,
    data_ptr: usize,
    dsp: Option<DspChain>,
    resampler: Box<dyn Resampler>,
    float_in: Vec<f32>,
    float_out: Vec<f32>,
    s16_out: Vec<i16>,
    rewind_out: Vec<i16>,
    perf: PerfCounters,
}

impl AudioPipeline {
    /// Build the pipeline for a core producing `input_rate` Hz (already
    /// paced, see [`adjusted_input_rate`]).
    pub fn from_config(config: &AudioConfig, input_rate: f64, slowmotion_ratio: f64) -> Self {
        let chunk_size = if config.sync {
            AUDIO_CHUNK_SIZE_BLOCKING
        } else {
            AUDIO_CHUNK_SIZE_NONBLOCKING
        };
        let dsp = DspChain::from_config(&config.dsp, input_rate as f32);
        if let Some(chain) = &dsp {
            info!("audio DSP enabled with {} effects", chain.len());
        }
        Self {
            output_rate: config.output_rate as f64,
            input_rate,
            gain: db_to_gain(config.volume_db),
            use_float: config.use_float,
            rate_control: config.rate_control,
            rate_control_delta: config.rate_control_delta,
            slowmotion_ratio,
            chunk_size,
            staging: vec![0; chunk_size],
            data_ptr: 0,
            dsp,
            resampler: Box::new(LinearResampler::new()),
            float_in: Vec::new(),
            float_out: Vec::new(),
            s16_out: Vec::new(),
            rewind_out: Vec::new(),
            perf: PerfCounters::default(),
        }
    }

    pub fn with_resampler(mut self, resampler: Box<dyn Resampler>) -> Self {
        self.resampler = resampler;
        self
    }

    pub fn input_rate(&self) -> f64 {
        self.input_rate
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Samples staged and not yet flushed.
    pub fn staged(&self) -> usize {
        self.data_ptr
    }

    pub fn perf(&self) -> &PerfCounters {
        &self.perf
    }

    /// Ratio before slow motion, nudged by sink fill when rate control is on.
    pub fn driving_ratio(&self, sink: &dyn AudioSink) -> f64 {
        let base = self.output_rate / self.input_rate;
        if !self.rate_control {
            return base;
        }
        match (sink.write_avail(), sink.buffer_size()) {
            (Some(avail), Some(size)) if size >= 2 => {
                let half = (size / 2) as f64;
                let direction = (avail as f64 - half) / half;
                base * (1.0 + self.rate_control_delta * direction)
            }
            _ => base,
        }
    }

    // ========================================================================
    // Forward play
    // ========================================================================

    /// Push one run of interleaved stereo samples through to the sink.
    pub fn flush(
        &mut self,
        ctx: &mut SessionContext,
        io: &mut Collaborators,
        samples: &[i16],
    ) -> Result<(), AudioError> {
        if let Some(recorder) = io.recorder.as_deref_mut() {
            recorder.push_audio(samples);
        }

        if ctx.flags.intersects(SessionFlags::PAUSED | SessionFlags::MUTED) {
            return Ok(());
        }
        let Some(sink) = io.audio.as_deref_mut() else {
            return Err(AudioError::Inactive);
        };
        if !ctx.is_audio_active() {
            return Err(AudioError::Inactive);
        }

        let mut frames = samples.len() / 2;
        if frames == 0 {
            return Ok(());
        }

        self.float_in.resize(frames * 2, 0.0);
        let (float_in, gain) = (&mut self.float_in, self.gain);
        self.perf.measure(Stage::AudioConvertS16, || {
            s16_to_float(&samples[..frames * 2], float_in, gain)
        });

        if let Some(dsp) = self.dsp.as_mut() {
            let float_in = &mut self.float_in;
            frames = self
                .perf
                .measure(Stage::AudioDsp, || dsp.process(float_in, frames))
                .min(frames);
        }

        let mut ratio = self.driving_ratio(sink);
        if ctx.flags.contains(SessionFlags::SLOWMOTION) {
            ratio *= self.slowmotion_ratio;
        }
        let ratio = ratio.clamp(1.0 / AUDIO_MAX_RATIO, AUDIO_MAX_RATIO);

        self.float_out.resize(max_output_frames(frames, ratio) * 2, 0.0);
        let resampler = &mut self.resampler;
        let request = ResampleRequest {
            input: &self.float_in[..frames * 2],
            input_frames: frames,
            output: &mut self.float_out,
            ratio,
        };
        let out_frames = self
            .perf
            .measure(Stage::Resample, || resampler.process(request));
        let out = &self.float_out[..out_frames * 2];

        let result = if self.use_float && sink.accepts_float() {
            sink.write(AudioBuffer::Float(out))
        } else {
            self.s16_out.resize(out.len(), 0);
            let s16_out = &mut self.s16_out;
            self.perf
                .measure(Stage::AudioConvertFloat, || float_to_s16(out, s16_out));
            sink.write(AudioBuffer::S16(&self.s16_out))
        };

        self.perf.maybe_log();

        if let Err(e) = result {
            error!("audio write failed ({}), disabling audio output for this session", e);
            ctx.set_flag(SessionFlags::AUDIO_ACTIVE, false);
            return Err(e.into());
        }
        Ok(())
    }

    /// Stage one stereo pair, flushing when the chunk fills.
    pub fn sample(&mut self, ctx: &mut SessionContext, io: &mut Collaborators, left: i16, right: i16) {
        self.staging[self.data_ptr] = left;
        self.staging[self.data_ptr + 1] = right;
        self.data_ptr += 2;
        if self.data_ptr < self.chunk_size {
            return;
        }

        let chunk = std::mem::take(&mut self.staging);
        // Failures are already reflected in the session flags.
        let _ = self.flush(ctx, io, &chunk);
        self.staging = chunk;
        self.data_ptr = 0;
    }

    /// Flush a batch, clamped to the non-blocking maximum. Returns the
    /// number of frames accepted.
    pub fn sample_batch(&mut self, ctx: &mut SessionContext, io: &mut Collaborators, data: &[i16]) -> usize {
        let frames = (data.len() / 2).min(AUDIO_BATCH_MAX_FRAMES);
        if frames == 0 {
            return 0;
        }
        let _ = self.flush(ctx, io, &data[..frames * 2]);
        frames
    }

    // ========================================================================
    // Rewind capture
    // ========================================================================

    /// Capture one pair into the rewind buffer.
    pub fn capture_sample(&mut self, ctx: &mut SessionContext, left: i16, right: i16) {
        if let Err(e) = ctx.rewind.push_pair(left, right) {
            warn!("dropping rewind audio: {}", e);
        }
    }

    /// Capture a batch into the rewind buffer. A batch that does not fit is
    /// dropped whole and reported as 0 frames accepted.
    pub fn capture_batch(&mut self, ctx: &mut SessionContext, data: &[i16]) -> usize {
        let frames = (data.len() / 2).min(AUDIO_BATCH_MAX_FRAMES);
        match ctx.rewind.push_batch(&data[..frames * 2]) {
            Ok(()) => frames,
            Err(e) => {
                warn!("dropping rewind audio batch: {}", e);
                0
            }
        }
    }

    /// Flush the audio captured during a rewind step and reset the cursor.
    pub fn flush_rewind(&mut self, ctx: &mut SessionContext, io: &mut Collaborators) -> Result<(), AudioError> {
        let mut captured = std::mem::take(&mut self.rewind_out);
        captured.clear();
        captured.extend_from_slice(ctx.rewind.captured());
        ctx.rewind.begin_capture();

        let result = if captured.is_empty() {
            Ok(())
        } else {
            self.flush(ctx, io, &captured)
        };
        self.rewind_out = captured;
        result
    }

    /// Drop staged samples and stream history.
    pub fn reset(&mut self) {
        self.data_ptr = 0;
        self.resampler.reset();
        if let Some(dsp) = self.dsp.as_mut() {
            dsp.reset();
        }
        self.perf.reset();
    }
}
