//! Shared identifiers for the retrolink callback layer.
//!
//! Everything here is plain data: device classes, button and key ids,
//! bind thresholds, pixel formats and audio chunk constants. The core
//! crate and anything driving it (frontends, test harnesses) agree on
//! these values.

pub mod constants;
pub mod ids;
pub mod pixel;

pub use constants::*;
pub use ids::*;
pub use pixel::PixelFormat;
