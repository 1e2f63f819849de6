//! Per-stage timing counters
//!
//! Each pipeline stage (pixel conversion, soft filter, sample conversion,
//! DSP, resampling) accumulates call counts and elapsed time. The summary
//! is logged at most once per interval.

use std::time::{Duration, Instant};

use hashbrown::HashMap;
use tracing::debug;

/// Pipeline stages that are timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    VideoConvert,
    SoftFilter,
    AudioConvertS16,
    AudioDsp,
    Resample,
    AudioConvertFloat,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Self::VideoConvert => "video_frame_conv",
            Self::SoftFilter => "softfilter_process",
            Self::AudioConvertS16 => "audio_convert_s16",
            Self::AudioDsp => "audio_dsp",
            Self::Resample => "resampler_proc",
            Self::AudioConvertFloat => "audio_convert_float",
        }
    }
}

/// Accumulated timing of one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageCounter {
    pub calls: u64,
    pub total: Duration,
}

impl StageCounter {
    pub fn average(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total.div_f64(self.calls as f64)
        }
    }
}

/// Timing counters for all stages.
#[derive(Debug)]
pub struct PerfCounters {
    counters: HashMap<Stage, StageCounter>,
    log_interval: Duration,
    last_log: Instant,
}

impl Default for PerfCounters {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl PerfCounters {
    pub fn new(log_interval: Duration) -> Self {
        Self {
            counters: HashMap::new(),
            log_interval,
            last_log: Instant::now(),
        }
    }

    /// Run `f`, charging its duration to `stage`.
    #[inline]
    pub fn measure<T>(&mut self, stage: Stage, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        let counter = self.counters.entry(stage).or_default();
        counter.calls += 1;
        counter.total += start.elapsed();
        out
    }

    pub fn get(&self, stage: Stage) -> StageCounter {
        self.counters.get(&stage).copied().unwrap_or_default()
    }

    /// Log a summary if the interval elapsed.
    pub fn maybe_log(&mut self) {
        if self.last_log.elapsed() < self.log_interval {
            return;
        }
        for (stage, counter) in &self.counters {
            debug!(
                "perf {}: calls={} avg={:?} total={:?}",
                stage.name(),
                counter.calls,
                counter.average(),
                counter.total
            );
        }
        self.last_log = Instant::now();
    }

    pub fn reset(&mut self) {
        self.counters.clear();
        self.last_log = Instant::now();
    }
}
