//! Software frame filters
//!
//! A filter reads one converted frame and writes a (usually larger) frame
//! into a buffer owned by the video pipeline.

use serde::{Deserialize, Serialize};

/// Filter selection as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Integer nearest-neighbour upscale.
    Nearest,
}

/// `[video.filter]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub kind: FilterKind,
    #[serde(default = "default_scale")]
    pub scale: u32,
}

/// Largest accepted upscale factor.
pub const MAX_FILTER_SCALE: u32 = 8;

fn default_scale() -> u32 {
    2
}

impl FilterConfig {
    pub fn build(&self) -> Box<dyn SoftFilter> {
        match self.kind {
            FilterKind::Nearest => Box::new(NearestScale::new(self.scale)),
        }
    }
}

/// Pixel rows handed to a filter.
#[derive(Debug, Clone, Copy)]
pub struct FilterInput<'a> {
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub pitch: usize,
    pub bytes_per_pixel: usize,
}

/// CPU-side frame filter.
pub trait SoftFilter: Send {
    /// Output dimensions for an input of `width` x `height`.
    fn output_size(&self, width: u32, height: u32) -> (u32, u32);

    /// Filter `input` into `output` with row stride `output_pitch`.
    fn process(&mut self, input: &FilterInput<'_>, output: &mut [u8], output_pitch: usize);
}

/// Integer nearest-neighbour upscale.
#[derive(Debug, Clone, Copy)]
pub struct NearestScale {
    factor: u32,
}

impl NearestScale {
    pub fn new(factor: u32) -> Self {
        Self {
            factor: factor.clamp(1, MAX_FILTER_SCALE),
        }
    }
}

impl SoftFilter for NearestScale {
    fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        (width.saturating_mul(self.factor), height.saturating_mul(self.factor))
    }

    fn process(&mut self, input: &FilterInput<'_>, output: &mut [u8], output_pitch: usize) {
        let factor = self.factor as usize;
        let bpp = input.bytes_per_pixel;
        let row_bytes = input.width as usize * bpp;

        for y in 0..input.height as usize {
            let src_row = &input.pixels[y * input.pitch..y * input.pitch + row_bytes];
            let first = y * factor * output_pitch;
            {
                let dst_row = &mut output[first..first + row_bytes * factor];
                for (src_px, dst_px) in src_row
                    .chunks_exact(bpp)
                    .zip(dst_row.chunks_exact_mut(bpp * factor))
                {
                    for out in dst_px.chunks_exact_mut(bpp) {
                        out.copy_from_slice(src_px);
                    }
                }
            }
            for rep in 1..factor {
                let start = first + rep * output_pitch;
                output.copy_within(first..first + row_bytes * factor, start);
            }
        }
    }
}
