//! Variable-ratio stereo resampling
//!
//! The ratio (`output_rate / input_rate`) may change on every call, which
//! is how rate control and slow motion steer the stream. The resampler
//! keeps its fractional read position and the last input frame between
//! calls, so consecutive runs join without a seam.

/// One resampling call over interleaved stereo `f32`.
pub struct ResampleRequest<'a> {
    pub input: &'a [f32],
    pub input_frames: usize,
    pub output: &'a mut [f32],
    /// Output frames produced per input frame.
    pub ratio: f64,
}

/// Stateful sample rate converter.
pub trait Resampler: Send {
    /// Resample one run, returning the number of output frames written.
    fn process(&mut self, request: ResampleRequest<'_>) -> usize;

    /// Forget stream history (after a seek, rewind or device change).
    fn reset(&mut self);
}

/// Linear interpolation between neighbouring frames.
#[derive(Debug, Clone, Default)]
pub struct LinearResampler {
    /// Last frame of the previous run; position 0 refers to it.
    prev: [f32; 2],
    /// Read position relative to `prev`, in input frames.
    position: f64,
}

impl LinearResampler {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn frame_at(&self, input: &[f32], idx: usize) -> [f32; 2] {
        if idx == 0 {
            self.prev
        } else {
            [input[(idx - 1) * 2], input[(idx - 1) * 2 + 1]]
        }
    }
}

impl Resampler for LinearResampler {
    fn process(&mut self, request: ResampleRequest<'_>) -> usize {
        let ResampleRequest {
            input,
            input_frames,
            output,
            ratio,
        } = request;

        if input_frames == 0 || ratio <= 0.0 {
            return 0;
        }

        let step = 1.0 / ratio;
        let max_out = output.len() / 2;
        let mut written = 0;
        let mut pos = self.position;

        while pos < input_frames as f64 {
            if written == max_out {
                tracing::warn!(
                    "resampler output full after {} frames, dropping remainder of run",
                    written
                );
                break;
            }
            let idx = pos as usize;
            let t = (pos - idx as f64) as f32;
            let a = self.frame_at(input, idx);
            let b = self.frame_at(input, idx + 1);
            output[written * 2] = a[0] + (b[0] - a[0]) * t;
            output[written * 2 + 1] = a[1] + (b[1] - a[1]) * t;
            written += 1;
            pos += step;
        }

        self.position = (pos - input_frames as f64).max(0.0);
        let last = (input_frames - 1) * 2;
        self.prev = [input[last], input[last + 1]];
        written
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Output frames a run of `input_frames` can produce at `ratio`, with headroom.
pub fn max_output_frames(input_frames: usize, ratio: f64) -> usize {
    (input_frames as f64 * ratio).ceil() as usize + 2
}
