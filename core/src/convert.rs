//! Pixel and sample format conversion
//!
//! Leaf helpers shared by the video and audio pipelines. None of them
//! allocate; callers own the destination buffers.

// ============================================================================
// Pixels
// ============================================================================

/// Convert `0RGB1555` rows to tightly packed `RGB565`.
///
/// `src_pitch` is the source row stride in bytes; the destination stride is
/// `width * 2`. Pixels are in native byte order, as the core wrote them.
pub fn rgb1555_to_rgb565(src: &[u8], width: usize, height: usize, src_pitch: usize, dst: &mut [u8]) {
    let dst_pitch = width * 2;
    for y in 0..height {
        let src_row = &src[y * src_pitch..y * src_pitch + dst_pitch];
        let dst_row = &mut dst[y * dst_pitch..(y + 1) * dst_pitch];
        for (s, d) in src_row.chunks_exact(2).zip(dst_row.chunks_exact_mut(2)) {
            let p = u16::from_ne_bytes([s[0], s[1]]);
            d.copy_from_slice(&rgb1555_pixel_to_rgb565(p).to_ne_bytes());
        }
    }
}

/// Expand a single 15-bit pixel; green gains its low bit from its top bit.
#[inline]
pub fn rgb1555_pixel_to_rgb565(p: u16) -> u16 {
    let r = (p >> 10) & 0x1f;
    let g = (p >> 5) & 0x1f;
    let b = p & 0x1f;
    let g6 = (g << 1) | (g >> 4);
    (r << 11) | (g6 << 5) | b
}

// ============================================================================
// Samples
// ============================================================================

/// `i16` to `f32` in [-1, 1), scaled by `gain`.
pub fn s16_to_float(src: &[i16], dst: &mut [f32], gain: f32) {
    let scale = gain / 32768.0;
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = s as f32 * scale;
    }
}

/// `f32` to `i16` with saturation.
pub fn float_to_s16(src: &[f32], dst: &mut [i16]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = (s * 32768.0).round().clamp(-32768.0, 32767.0) as i16;
    }
}

/// Linear gain for a volume in decibels.
pub fn db_to_gain(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}
