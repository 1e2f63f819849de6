//! Video frame pipeline
//!
//! One call per core frame: legacy pixel conversion, the recording tap,
//! the optional software filter and finally presentation. Dupe and
//! hardware frames skip conversion and filtering.

pub mod filter;


use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::convert::rgb1555_to_rgb565;
use crate::perf::{PerfCounters, Stage};
use crate::session::{FrameCache, SessionContext, SessionFlags};
use crate::sinks::{Collaborators, Frame};

use filter::{FilterConfig, FilterInput, SoftFilter};

/// Video configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Record the filtered frame instead of the core's frame.
    #[serde(default)]
    pub post_filter_record: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterConfig>,

    /// Display refresh rate in Hz, used to pace audio against video.
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate: f64,
}

fn default_refresh_rate() -> f64 {
    59.95
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            post_filter_record: false,
            filter: None,
            refresh_rate: default_refresh_rate(),
        }
    }
}

/// Video frame pipeline
pub struct VideoPipeline {
    post_filter_record: bool,
    filter: Option<Box<dyn SoftFilter>>,
    /// Conversion output, reused across frames.
    converted: Vec<u8>,
    /// Filter output, reused across frames.
    filtered: Vec<u8>,
    perf: PerfCounters,
}

impl VideoPipeline {
    pub fn new(filter: Option<Box<dyn SoftFilter>>, post_filter_record: bool) -> Self {
        Self {
            post_filter_record,
            filter,
            converted: Vec::new(),
            filtered: Vec::new(),
            perf: PerfCounters::default(),
        }
    }

    pub fn from_config(config: &VideoConfig) -> Self {
        Self::new(
            config.filter.as_ref().map(FilterConfig::build),
            config.post_filter_record,
        )
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    pub fn perf(&self) -> &PerfCounters {
        &self.perf
    }

    /// Run one frame through the pipeline.
    pub fn present(&mut self, ctx: &mut SessionContext, io: &mut Collaborators, frame: &Frame<'_>) {
        if !ctx.is_video_active() {
            return;
        }

        ctx.frame_cache = Some(FrameCache {
            width: frame.width,
            height: frame.height,
            pitch: frame.pitch,
        });

        let Some(pixels) = frame.pixels() else {
            if let Some(recorder) = io.recorder.as_deref_mut() {
                recorder.dump_frame(frame);
            }
            let message = ctx.messages.pull();
            deliver(ctx, io, frame, message.as_deref());
            return;
        };

        let format = ctx.pixel_format;
        let bpp = format.bytes_per_pixel();
        let width = frame.width as usize;
        let height = frame.height as usize;
        if height > 0 && pixels.len() < frame.pitch * (height - 1) + width * bpp {
            warn!(
                "dropping {}x{} frame: {} bytes is short for pitch {}",
                frame.width,
                frame.height,
                pixels.len(),
                frame.pitch
            );
            return;
        }

        let (src, src_pitch): (&[u8], usize) = if format.needs_conversion() {
            let dst_pitch = width * 2;
            self.converted.resize(dst_pitch * height, 0);
            let dst = &mut self.converted;
            self.perf.measure(Stage::VideoConvert, || {
                rgb1555_to_rgb565(pixels, width, height, frame.pitch, dst)
            });
            (&self.converted, dst_pitch)
        } else {
            (pixels, frame.pitch)
        };
        let converted = Frame::new(src, frame.width, frame.height, src_pitch);

        let record_post = self.post_filter_record && self.filter.is_some();
        if !record_post && let Some(recorder) = io.recorder.as_deref_mut() {
            recorder.dump_frame(&converted);
        }

        let message = ctx.messages.pull();

        let output = match self.filter.as_deref_mut() {
            Some(filter) => {
                let (out_width, out_height) = filter.output_size(frame.width, frame.height);
                let out_pitch = out_width as usize * bpp;
                self.filtered.resize(out_pitch * out_height as usize, 0);
                let input = FilterInput {
                    pixels: src,
                    width: frame.width,
                    height: frame.height,
                    pitch: src_pitch,
                    bytes_per_pixel: bpp,
                };
                let dst = &mut self.filtered;
                self.perf
                    .measure(Stage::SoftFilter, || filter.process(&input, dst, out_pitch));
                Frame::new(&self.filtered, out_width, out_height, out_pitch)
            }
            None => converted,
        };

        if record_post && let Some(recorder) = io.recorder.as_deref_mut() {
            recorder.dump_frame(&output);
        }

        deliver(ctx, io, &output, message.as_deref());
        self.perf.maybe_log();
    }

    /// Re-present the last frame (paused frontend, menu overlay).
    ///
    /// Only the geometry is cached, so the sink is asked to dupe.
    pub fn present_cached(&mut self, ctx: &mut SessionContext, io: &mut Collaborators) -> bool {
        let Some(cache) = ctx.frame_cache else {
            return false;
        };
        if !ctx.is_video_active() {
            return false;
        }
        let frame = Frame::dupe(cache.width, cache.height, cache.pitch);
        let message = ctx.messages.pull();
        deliver(ctx, io, &frame, message.as_deref());
        ctx.is_video_active()
    }
}

fn deliver(ctx: &mut SessionContext, io: &mut Collaborators, frame: &Frame<'_>, message: Option<&str>) {
    let Some(video) = io.video.as_deref_mut() else {
        return;
    };
    if !video.present(frame, message) {
        error!("video presentation failed, disabling video output for this session");
        ctx.set_flag(SessionFlags::VIDEO_ACTIVE, false);
    }
}
