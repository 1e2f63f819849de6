//! Overlay fusion
//!
//! Every poll rebuilds the overlay aggregate from scratch out of all
//! active pointer contacts:
//! - button and key bitsets are OR-ed together,
//! - for each of the four axes the last contact (in index order) with a
//!   nonzero value wins,
//! - key bits that changed since the previous poll become keyboard events,
//! - held analog "plus/minus" binds drive axes nobody else set,
//! - optionally one stick is thresholded into d-pad bits.

use retrolink_shared::{
    ANALOG_LEFT_X_PLUS, ANALOG_MAX, DEVICE_POINTER, DEVICE_POINTER_SCREEN, JOYPAD_DOWN,
    JOYPAD_LEFT, JOYPAD_RIGHT, JOYPAD_UP, KEY_LALT, KEY_LAST, KEY_LCTRL, KEY_LMETA, KEY_LSHIFT,
    KEY_RALT, KEY_RCTRL, KEY_RMETA, KEY_RSHIFT, KeyModifiers, POINTER_ID_PRESSED, POINTER_ID_X,
    POINTER_ID_Y,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::sinks::{InputDriver, KeyEvent, KeyboardListener, Overlay};

/// 32-bit words needed for the keyboard key space.
pub const KEY_WORDS: usize = (KEY_LAST as usize).div_ceil(32);

/// Fused overlay input: buttons, keys and four axes `[LX, LY, RX, RY]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlayState {
    pub buttons: u64,
    pub keys: [u32; KEY_WORDS],
    pub analog: [i16; 4],
}

impl OverlayState {
    pub fn button(&self, id: u32) -> bool {
        id < 64 && self.buttons & (1 << id) != 0
    }

    pub fn set_button(&mut self, id: u32) {
        if id < 64 {
            self.buttons |= 1 << id;
        }
    }

    pub fn key(&self, code: u32) -> bool {
        code < KEY_LAST && self.keys[(code / 32) as usize] & (1 << (code % 32)) != 0
    }

    pub fn set_key(&mut self, code: u32) {
        if code < KEY_LAST {
            self.keys[(code / 32) as usize] |= 1 << (code % 32);
        }
    }

    /// Fold one contact's contribution into the aggregate. Later calls
    /// override earlier ones for any axis they set to a nonzero value.
    pub fn merge_contact(&mut self, contact: &OverlayState) {
        self.buttons |= contact.buttons;
        for (dst, src) in self.keys.iter_mut().zip(contact.keys) {
            *dst |= src;
        }
        for (dst, &src) in self.analog.iter_mut().zip(&contact.analog) {
            if src != 0 {
                *dst = src;
            }
        }
    }

    /// Modifier flags implied by the held keys.
    pub fn modifiers(&self) -> KeyModifiers {
        let mut mods = KeyModifiers::empty();
        if self.key(KEY_LSHIFT) || self.key(KEY_RSHIFT) {
            mods |= KeyModifiers::SHIFT;
        }
        if self.key(KEY_LCTRL) || self.key(KEY_RCTRL) {
            mods |= KeyModifiers::CTRL;
        }
        if self.key(KEY_LALT) || self.key(KEY_RALT) {
            mods |= KeyModifiers::ALT;
        }
        if self.key(KEY_LMETA) || self.key(KEY_RMETA) {
            mods |= KeyModifiers::META;
        }
        mods
    }
}

/// Which stick, if any, doubles as a d-pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalogDpadMode {
    #[default]
    None,
    LeftStick,
    RightStick,
}

/// Knobs for one overlay poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlaySettings {
    pub analog_dpad_mode: AnalogDpadMode,
    pub axis_threshold: f32,
    pub opacity: f32,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            analog_dpad_mode: AnalogDpadMode::None,
            axis_threshold: 0.5,
            opacity: 0.7,
        }
    }
}

/// Recompute `state` from the overlay's active contacts.
///
/// Returns the number of contacts fused. Overlays that are not alive are
/// left alone and `state` keeps its previous value.
pub fn poll_overlay(
    state: &mut OverlayState,
    overlay: &mut dyn Overlay,
    driver: &mut dyn InputDriver,
    keyboard: Option<&mut (dyn KeyboardListener + '_)>,
    settings: &OverlaySettings,
) -> usize {
    if !overlay.is_alive() {
        return 0;
    }

    let old_keys = state.keys;
    *state = OverlayState::default();

    let device = if overlay.is_full_screen() {
        DEVICE_POINTER_SCREEN
    } else {
        DEVICE_POINTER
    };

    // Contacts are reported densely from index 0; the first absent index ends the list.
    let contacts: SmallVec<[(i16, i16); 4]> = (0u32..)
        .map_while(|i| {
            (driver.state(None, 0, device, i, POINTER_ID_PRESSED) != 0).then(|| {
                (
                    driver.state(None, 0, device, i, POINTER_ID_X),
                    driver.state(None, 0, device, i, POINTER_ID_Y),
                )
            })
        })
        .collect();

    for &(x, y) in &contacts {
        let contribution = overlay.poll(x, y);
        state.merge_contact(&contribution);
    }

    emit_key_edges(&old_keys, state, keyboard);
    synthesize_analog_from_buttons(state);
    apply_analog_dpad(state, settings);

    if contacts.is_empty() {
        overlay.poll_clear(settings.opacity);
    } else {
        overlay.post_poll(settings.opacity);
    }
    contacts.len()
}

fn emit_key_edges(
    old_keys: &[u32; KEY_WORDS],
    state: &OverlayState,
    keyboard: Option<&mut (dyn KeyboardListener + '_)>,
) {
    let Some(keyboard) = keyboard else {
        return;
    };
    let modifiers = state.modifiers();
    for (word, (&old, &new)) in old_keys.iter().zip(&state.keys).enumerate() {
        let changed = old ^ new;
        if changed == 0 {
            continue;
        }
        for bit in 0..32 {
            if changed & (1 << bit) != 0 {
                keyboard.key_event(KeyEvent {
                    down: new & (1 << bit) != 0,
                    code: word as u32 * 32 + bit,
                    character: 0,
                    modifiers,
                    device: DEVICE_POINTER,
                });
            }
        }
    }
}

/// Held `(plus, minus)` binds push an untouched axis to full scale.
fn synthesize_analog_from_buttons(state: &mut OverlayState) {
    for axis in 0..4u32 {
        if state.analog[axis as usize] != 0 {
            continue;
        }
        let plus = ANALOG_LEFT_X_PLUS + 2 * axis;
        let minus = plus + 1;
        let mut value = 0i16;
        if state.button(plus) {
            value += ANALOG_MAX;
        }
        if state.button(minus) {
            value -= ANALOG_MAX;
        }
        state.analog[axis as usize] = value;
    }
}

fn apply_analog_dpad(state: &mut OverlayState, settings: &OverlaySettings) {
    let base = match settings.analog_dpad_mode {
        AnalogDpadMode::None => return,
        AnalogDpadMode::LeftStick => 0,
        AnalogDpadMode::RightStick => 2,
    };
    let x = state.analog[base] as f32 / ANALOG_MAX as f32;
    let y = state.analog[base + 1] as f32 / ANALOG_MAX as f32;
    let threshold = settings.axis_threshold;

    if x <= -threshold {
        state.set_button(JOYPAD_LEFT);
    }
    if x >= threshold {
        state.set_button(JOYPAD_RIGHT);
    }
    if y <= -threshold {
        state.set_button(JOYPAD_UP);
    }
    if y >= threshold {
        state.set_button(JOYPAD_DOWN);
    }
}
