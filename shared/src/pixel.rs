//! Pixel formats a core can declare for its frames.

use serde::{Deserialize, Serialize};

/// Pixel layout of a frame produced by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Legacy 15-bit `0RGB1555`, converted before presentation.
    #[default]
    Rgb1555,
    /// 32-bit `XRGB8888`.
    Xrgb8888,
    /// 16-bit `RGB565`.
    Rgb565,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb1555 | Self::Rgb565 => 2,
            Self::Xrgb8888 => 4,
        }
    }

    /// Whether frames in this format must be converted before they reach a sink.
    pub const fn needs_conversion(self) -> bool {
        matches!(self, Self::Rgb1555)
    }
}
