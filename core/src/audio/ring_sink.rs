//! Ring buffer audio sink
//!
//! The pipeline pushes resampled `f32` samples into a lock-free ring;
//! the device callback pops them on its own thread and plays silence when
//! the ring runs dry.

use ringbuf::traits::{Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::debug;

use crate::error::SinkError;
use crate::sinks::{AudioBuffer, AudioSink};

/// About 100ms of stereo audio at 48 kHz.
pub const DEFAULT_RING_SIZE: usize = 9600;

/// Producer half of an audio ring.
pub struct RingAudioSink {
    producer: HeapProd<f32>,
    capacity: usize,
}

impl RingAudioSink {
    /// Create a sink with room for `capacity` samples and the consumer the
    /// device callback reads from.
    pub fn new(capacity: usize) -> (Self, HeapCons<f32>) {
        // Whole stereo frames only.
        let capacity = capacity.max(2).next_multiple_of(2);
        let ring = HeapRb::<f32>::new(capacity);
        let (producer, consumer) = ring.split();
        (Self { producer, capacity }, consumer)
    }

    /// Samples that fit as whole stereo frames.
    fn frame_room(&self, offered: usize) -> usize {
        (self.producer.vacant_len() & !1).min(offered & !1)
    }
}

impl AudioSink for RingAudioSink {
    fn write(&mut self, buffer: AudioBuffer<'_>) -> Result<usize, SinkError> {
        let offered = match buffer {
            AudioBuffer::Float(samples) => samples.len(),
            AudioBuffer::S16(samples) => samples.len(),
        };
        let room = self.frame_room(offered);
        let pushed = match buffer {
            AudioBuffer::Float(samples) => self.producer.push_slice(&samples[..room]),
            AudioBuffer::S16(samples) => self
                .producer
                .push_iter(samples[..room].iter().map(|&s| s as f32 / 32768.0)),
        };
        if pushed < offered {
            debug!("audio ring overflow: dropped {} samples", offered - pushed);
        }
        Ok(pushed / 2)
    }

    fn write_avail(&self) -> Option<usize> {
        Some(self.producer.vacant_len())
    }

    fn buffer_size(&self) -> Option<usize> {
        Some(self.capacity)
    }
}
