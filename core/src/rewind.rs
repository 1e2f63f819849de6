//! Reverse-time audio capture for rewind
//!
//! While a rewind step runs the core forward from a saved state, its audio
//! is written backward from the end of a fixed buffer toward the start, so
//! reading the captured region front to back plays that step in reverse.
//!
//! The buffer holds one step's worst-case audio and tracks how much room is
//! left. Writes that would move the cursor below zero are rejected whole
//! instead of wrapping.

use retrolink_shared::AUDIO_BATCH_MAX_FRAMES;

use crate::error::RewindError;

/// Stereo frames one rewind step can produce for a core running at `fps`
/// with `sample_rate` Hz audio: one video frame's worth, rounded up, plus
/// one maximal batch for cores that deliver audio in uneven chunks.
pub fn step_frames_for(sample_rate: f64, fps: f64) -> usize {
    if fps.is_nan() || sample_rate.is_nan() || fps <= 0.0 || sample_rate <= 0.0 {
        return AUDIO_BATCH_MAX_FRAMES;
    }
    (sample_rate / fps).ceil() as usize + AUDIO_BATCH_MAX_FRAMES
}

/// Fixed-capacity, backward-filled sample buffer.
#[derive(Debug, Clone)]
pub struct RewindBuffer {
    samples: Box<[i16]>,
    /// Index of the most recently written sample; equals capacity when empty.
    cursor: usize,
}

impl RewindBuffer {
    /// Buffer sized for exactly `step_frames` stereo frames.
    pub fn for_step(step_frames: usize) -> Self {
        let capacity = step_frames * 2;
        Self {
            samples: vec![0; capacity].into_boxed_slice(),
            cursor: capacity,
        }
    }

    /// Capacity in samples.
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Capacity in stereo frames.
    pub fn capacity_frames(&self) -> usize {
        self.samples.len() / 2
    }

    /// Samples that can still be written this step.
    pub fn remaining(&self) -> usize {
        self.cursor
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Start a new step: the whole buffer is free again.
    pub fn begin_capture(&mut self) {
        self.cursor = self.samples.len();
    }

    /// Store one stereo pair, right channel first, so that the pair reads
    /// `left, right` in the captured region.
    pub fn push_pair(&mut self, left: i16, right: i16) -> Result<(), RewindError> {
        self.reserve(2)?;
        self.cursor -= 1;
        self.samples[self.cursor] = right;
        self.cursor -= 1;
        self.samples[self.cursor] = left;
        Ok(())
    }

    /// Store interleaved samples one element at a time, each below the last.
    pub fn push_batch(&mut self, samples: &[i16]) -> Result<(), RewindError> {
        self.reserve(samples.len())?;
        for &s in samples {
            self.cursor -= 1;
            self.samples[self.cursor] = s;
        }
        Ok(())
    }

    /// Region written during the current step, most recent sample first.
    pub fn captured(&self) -> &[i16] {
        &self.samples[self.cursor..]
    }

    fn reserve(&self, requested: usize) -> Result<(), RewindError> {
        if requested > self.cursor {
            return Err(RewindError {
                requested,
                remaining: self.cursor,
            });
        }
        Ok(())
    }
}
