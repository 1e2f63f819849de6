//! Device classes and input identifiers.
//!
//! The numeric values are part of the core-facing contract: cores ask
//! for `state(port, device, index, id)` with exactly these numbers.

// ============================================================================
// Device classes
// ============================================================================

/// Mask applied to incoming device values (subclasses live in the upper bits).
pub const DEVICE_MASK: u32 = 0xff;

pub const DEVICE_NONE: u32 = 0;
pub const DEVICE_JOYPAD: u32 = 1;
pub const DEVICE_MOUSE: u32 = 2;
pub const DEVICE_KEYBOARD: u32 = 3;
pub const DEVICE_LIGHTGUN: u32 = 4;
pub const DEVICE_ANALOG: u32 = 5;
pub const DEVICE_POINTER: u32 = 6;

/// Screen-space pointer, used for full-screen overlays.
pub const DEVICE_POINTER_SCREEN: u32 = DEVICE_POINTER | 0x1_0000;

// ============================================================================
// Joypad ids
// ============================================================================

pub const JOYPAD_B: u32 = 0;
pub const JOYPAD_Y: u32 = 1;
pub const JOYPAD_SELECT: u32 = 2;
pub const JOYPAD_START: u32 = 3;
pub const JOYPAD_UP: u32 = 4;
pub const JOYPAD_DOWN: u32 = 5;
pub const JOYPAD_LEFT: u32 = 6;
pub const JOYPAD_RIGHT: u32 = 7;
pub const JOYPAD_A: u32 = 8;
pub const JOYPAD_X: u32 = 9;
pub const JOYPAD_L: u32 = 10;
pub const JOYPAD_R: u32 = 11;
pub const JOYPAD_L2: u32 = 12;
pub const JOYPAD_R2: u32 = 13;
pub const JOYPAD_L3: u32 = 14;
pub const JOYPAD_R3: u32 = 15;

/// First id that is not a core-visible joypad button. Remapping only
/// applies below this value.
pub const FIRST_CUSTOM_BIND: u32 = 16;

/// Frontend binds that synthesize analog axes from digital buttons.
/// Laid out as `(plus, minus)` pairs for LX, LY, RX, RY.
pub const ANALOG_LEFT_X_PLUS: u32 = 16;
pub const ANALOG_LEFT_X_MINUS: u32 = 17;
pub const ANALOG_LEFT_Y_PLUS: u32 = 18;
pub const ANALOG_LEFT_Y_MINUS: u32 = 19;
pub const ANALOG_RIGHT_X_PLUS: u32 = 20;
pub const ANALOG_RIGHT_X_MINUS: u32 = 21;
pub const ANALOG_RIGHT_Y_PLUS: u32 = 22;
pub const ANALOG_RIGHT_Y_MINUS: u32 = 23;

/// Holding this bind latches turbo onto the buttons pressed with it.
pub const TURBO_ENABLE: u32 = 24;

/// First frontend hotkey id. Base driver reads at or above this value are
/// only forwarded for keyboard queries.
pub const FIRST_META_KEY: u32 = 25;

/// Whether `id` names one of the four directional pad buttons.
pub const fn is_dpad(id: u32) -> bool {
    id >= JOYPAD_UP && id <= JOYPAD_RIGHT
}

// ============================================================================
// Analog and pointer ids
// ============================================================================

pub const ANALOG_INDEX_LEFT: u32 = 0;
pub const ANALOG_INDEX_RIGHT: u32 = 1;
pub const ANALOG_ID_X: u32 = 0;
pub const ANALOG_ID_Y: u32 = 1;

pub const POINTER_ID_X: u32 = 0;
pub const POINTER_ID_Y: u32 = 1;
pub const POINTER_ID_PRESSED: u32 = 2;

/// Slot in the four-entry axis array for an `(index, id)` analog query:
/// `[left x, left y, right x, right y]`.
pub const fn analog_slot(index: u32, id: u32) -> usize {
    let base = if index == ANALOG_INDEX_RIGHT { 2 } else { 0 };
    if id == ANALOG_ID_Y { base + 1 } else { base }
}

// ============================================================================
// Keyboard
// ============================================================================

/// Size of the keyboard key space.
pub const KEY_LAST: u32 = 323;

pub const KEY_RSHIFT: u32 = 303;
pub const KEY_LSHIFT: u32 = 304;
pub const KEY_RCTRL: u32 = 305;
pub const KEY_LCTRL: u32 = 306;
pub const KEY_RALT: u32 = 307;
pub const KEY_LALT: u32 = 308;
pub const KEY_RMETA: u32 = 309;
pub const KEY_LMETA: u32 = 310;

bitflags::bitflags! {
    /// Keyboard modifier state attached to key events.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct KeyModifiers: u16 {
        const SHIFT = 0x01;
        const CTRL = 0x02;
        const ALT = 0x04;
        const META = 0x08;
    }
}

// ============================================================================
// Names
// ============================================================================

/// Configuration names for ids `0..FIRST_META_KEY`, indexed by id.
pub const BIND_NAMES: [&str; FIRST_META_KEY as usize] = [
    "b",
    "y",
    "select",
    "start",
    "up",
    "down",
    "left",
    "right",
    "a",
    "x",
    "l",
    "r",
    "l2",
    "r2",
    "l3",
    "r3",
    "l_x_plus",
    "l_x_minus",
    "l_y_plus",
    "l_y_minus",
    "r_x_plus",
    "r_x_minus",
    "r_y_plus",
    "r_y_minus",
    "turbo",
];

/// Look up a bind id by its configuration name (case-insensitive).
pub fn bind_id_from_name(name: &str) -> Option<u32> {
    BIND_NAMES
        .iter()
        .position(|n| n.eq_ignore_ascii_case(name))
        .map(|i| i as u32)
}

/// Configuration name of a bind id.
pub fn bind_name(id: u32) -> Option<&'static str> {
    BIND_NAMES.get(id as usize).copied()
}
