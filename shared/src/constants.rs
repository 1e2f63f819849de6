//! Centralized audio and input constants.
//!
//! Single source of truth for chunk sizes and per-session limits used by
//! the pipelines and by configuration defaults.

/// Staging chunk (in samples, stereo interleaved) used when audio sync is on.
pub const AUDIO_CHUNK_SIZE_BLOCKING: usize = 512;

/// Staging chunk (in samples, stereo interleaved) used when audio sync is off.
///
/// Also bounds a single `sample_batch` call: at most half of this many
/// stereo frames are accepted per call.
pub const AUDIO_CHUNK_SIZE_NONBLOCKING: usize = 2048;

/// Maximum stereo frames accepted by one batch call.
pub const AUDIO_BATCH_MAX_FRAMES: usize = AUDIO_CHUNK_SIZE_NONBLOCKING / 2;

/// Upper bound on the resampling ratio the pipeline sizes its buffers for.
pub const AUDIO_MAX_RATIO: f64 = 16.0;

/// Number of user ports handled by input aggregation.
pub const MAX_PORTS: usize = 4;

/// Full-scale value of a digital-to-analog axis.
pub const ANALOG_MAX: i16 = 0x7fff;

/// Default output sample rate of audio sinks.
pub const DEFAULT_OUTPUT_RATE: u32 = 48_000;
