//! Turbo modulation
//!
//! Holding the turbo bind while pressing a button latches that button under
//! turbo. Until it is released, its state is gated by a periodic pulse:
//! on while `phase % period < duty_cycle`. The phase is shared by all
//! ports and advances once per input poll.

use retrolink_shared::MAX_PORTS;
use serde::{Deserialize, Serialize};

/// Pulse shape, in polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurboSettings {
    pub period: u32,
    pub duty_cycle: u32,
}

impl Default for TurboSettings {
    fn default() -> Self {
        Self {
            period: 6,
            duty_cycle: 3,
        }
    }
}

/// Turbo latches and the global phase counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurboState {
    phase: u32,
    started: bool,
    /// Turbo bind held this poll, per port.
    frame_enable: [bool; MAX_PORTS],
    /// Ids currently under turbo, per port.
    latched: [u64; MAX_PORTS],
}

impl TurboState {
    /// Move to the next phase. The first call after reset yields phase 0.
    pub fn advance(&mut self) {
        if self.started {
            self.phase = self.phase.wrapping_add(1);
        } else {
            self.started = true;
        }
    }

    pub fn phase(&self) -> u32 {
        self.phase
    }

    pub fn set_phase(&mut self, phase: u32) {
        self.phase = phase;
        self.started = true;
    }

    pub fn set_frame_enable(&mut self, port: u32, held: bool) {
        if let Some(slot) = self.frame_enable.get_mut(port as usize) {
            *slot = held;
        }
    }

    pub fn is_latched(&self, port: u32, id: u32) -> bool {
        id < 64
            && self
                .latched
                .get(port as usize)
                .is_some_and(|mask| mask & (1 << id) != 0)
    }

    /// Update the latch for `(port, id)` and gate `pressed` by the pulse.
    pub fn apply(&mut self, settings: &TurboSettings, port: u32, id: u32, pressed: bool) -> bool {
        let p = port as usize;
        if p >= MAX_PORTS || id >= 64 {
            return pressed;
        }
        let bit = 1u64 << id;
        if pressed && self.frame_enable[p] {
            self.latched[p] |= bit;
        } else if !pressed {
            self.latched[p] &= !bit;
        }

        if self.latched[p] & bit != 0 {
            pressed && self.gate_open(settings)
        } else {
            pressed
        }
    }

    fn gate_open(&self, settings: &TurboSettings) -> bool {
        settings.period > 0 && (self.phase % settings.period) < settings.duty_cycle
    }
}
