//! In-memory input movie
//!
//! A movie is the flat sequence of values returned by every input query,
//! in query order. Recording appends; playback hands them back one by one
//! until the tape runs out.

use crate::sinks::MovieTape;

/// Whether a tape is being written or read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieMode {
    Recording,
    Playback,
}

/// Input movie held in memory.
#[derive(Debug, Clone)]
pub struct Movie {
    mode: MovieMode,
    values: Vec<i16>,
    /// Next value to play back.
    cursor: usize,
}

impl Movie {
    /// Start an empty recording.
    pub fn recorder() -> Self {
        Self {
            mode: MovieMode::Recording,
            values: Vec::new(),
            cursor: 0,
        }
    }

    /// Play back previously recorded values.
    pub fn player(values: Vec<i16>) -> Self {
        Self {
            mode: MovieMode::Playback,
            values,
            cursor: 0,
        }
    }

    pub fn mode(&self) -> MovieMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values not yet played back.
    pub fn remaining(&self) -> usize {
        self.values.len().saturating_sub(self.cursor)
    }

    pub fn values(&self) -> &[i16] {
        &self.values
    }

    /// Finish a recording and take its values.
    pub fn finish(self) -> Vec<i16> {
        self.values
    }

    /// Turn a finished recording into a player positioned at the start.
    pub fn into_player(self) -> Self {
        Self::player(self.values)
    }
}

impl MovieTape for Movie {
    fn is_playback(&self) -> bool {
        self.mode == MovieMode::Playback
    }

    fn get_input(&mut self) -> Option<i16> {
        if self.mode != MovieMode::Playback {
            return None;
        }
        let value = self.values.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(value)
    }

    fn set_input(&mut self, value: i16) {
        if self.mode == MovieMode::Recording {
            self.values.push(value);
        }
    }
}
