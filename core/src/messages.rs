//! On-screen status message queue
//!
//! Messages carry a priority and a lifetime in frames. Each video frame
//! pulls at most one message: the highest-priority one, whose remaining
//! lifetime is then counted down.

use std::collections::VecDeque;

/// Default maximum number of queued messages.
pub const DEFAULT_QUEUE_SIZE: usize = 8;

#[derive(Debug, Clone, PartialEq)]
struct QueuedMessage {
    text: String,
    priority: u32,
    frames_left: u32,
}

/// Priority queue of short-lived status messages.
#[derive(Debug, Clone)]
pub struct MessageQueue {
    entries: VecDeque<QueuedMessage>,
    capacity: usize,
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_SIZE)
    }
}

impl MessageQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Queue a message shown for `duration_frames` frames.
    ///
    /// With `flush` set, everything already queued is dropped first. When the
    /// queue is full the lowest-priority entry is evicted.
    pub fn push(&mut self, text: impl Into<String>, priority: u32, duration_frames: u32, flush: bool) {
        if flush {
            self.entries.clear();
        }
        if duration_frames == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            let lowest = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, m)| m.priority)
                .map(|(i, _)| i);
            if let Some(i) = lowest {
                if self.entries[i].priority > priority {
                    return;
                }
                self.entries.remove(i);
            }
        }
        self.entries.push_back(QueuedMessage {
            text: text.into(),
            priority,
            frames_left: duration_frames,
        });
    }

    /// Take the current message for one frame.
    ///
    /// Ties in priority go to the oldest message.
    pub fn pull(&mut self) -> Option<String> {
        let mut best: Option<usize> = None;
        for (i, m) in self.entries.iter().enumerate() {
            match best {
                Some(b) if self.entries[b].priority >= m.priority => {}
                _ => best = Some(i),
            }
        }
        let i = best?;
        let entry = &mut self.entries[i];
        let text = entry.text.clone();
        entry.frames_left -= 1;
        if entry.frames_left == 0 {
            self.entries.remove(i);
        }
        Some(text)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
