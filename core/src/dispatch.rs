//! Core-facing callback dispatch
//!
//! The core sees five stable entry points (video refresh, single sample,
//! sample batch, input poll, input state). Which behavior sits behind each
//! one is resolved from the session's [`OperatingMode`] on every call, so
//! switching modes never re-binds anything on the core side.
//!
//! | Mode            | Video   | Audio   | Input          |
//! |-----------------|---------|---------|----------------|
//! | Normal          | Direct  | Direct  | Direct         |
//! | Rewind          | Direct  | Rewind  | Direct         |
//! | NetplayHost     | Netplay | Netplay | Netplay        |
//! | NetplayClient   | Netplay | Netplay | Netplay        |
//! | Spectate(Host)  | Direct  | Direct  | SpectateHost   |
//! | Spectate(Client)| Direct  | Direct  | SpectateClient |

use retrolink_shared::PixelFormat;
use tracing::{info, warn};

use crate::audio::{AudioPipeline, adjusted_input_rate};
use crate::config::Config;
use crate::error::{AudioError, ConfigError};
use crate::input::InputPipeline;
use crate::netplay::suppress_output;
use crate::rewind::step_frames_for;
use crate::session::{OperatingMode, SessionContext, SessionFlags, SpectateRole};
use crate::sinks::{Collaborators, Frame};
use crate::video::VideoPipeline;

/// Timing the core reports for its audio and video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvInfo {
    pub fps: f64,
    pub sample_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoBinding {
    Direct,
    /// Skipped while the netplay link replays or stalls.
    Netplay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioBinding {
    Direct,
    /// Captured into the rewind buffer.
    Rewind,
    /// Skipped while the netplay link replays or stalls.
    Netplay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputBinding {
    Direct,
    Netplay,
    SpectateHost,
    SpectateClient,
}

/// Behavior bound to the callback slots for one operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackSet {
    pub video: VideoBinding,
    pub audio: AudioBinding,
    pub input: InputBinding,
}

impl CallbackSet {
    pub fn for_mode(mode: OperatingMode) -> Self {
        match mode {
            OperatingMode::Normal => Self {
                video: VideoBinding::Direct,
                audio: AudioBinding::Direct,
                input: InputBinding::Direct,
            },
            OperatingMode::Rewind => Self {
                video: VideoBinding::Direct,
                audio: AudioBinding::Rewind,
                input: InputBinding::Direct,
            },
            OperatingMode::NetplayHost | OperatingMode::NetplayClient => Self {
                video: VideoBinding::Netplay,
                audio: AudioBinding::Netplay,
                input: InputBinding::Netplay,
            },
            OperatingMode::NetplaySpectate(SpectateRole::Host) => Self {
                video: VideoBinding::Direct,
                audio: AudioBinding::Direct,
                input: InputBinding::SpectateHost,
            },
            OperatingMode::NetplaySpectate(SpectateRole::Client) => Self {
                video: VideoBinding::Direct,
                audio: AudioBinding::Direct,
                input: InputBinding::SpectateClient,
            },
        }
    }
}

/// One emulation session: context, collaborators and the three pipelines.
pub struct Frontend {
    ctx: SessionContext,
    io: Collaborators,
    video: VideoPipeline,
    audio: AudioPipeline,
    input: InputPipeline,
    rewind_enabled: bool,
}

impl Frontend {
    pub fn new(config: &Config, io: Collaborators, av: AvInfo) -> Result<Self, ConfigError> {
        config.validate()?;

        let input_rate = adjusted_input_rate(
            av.sample_rate,
            av.fps,
            config.video.refresh_rate,
            config.audio.max_timing_skew,
        );
        let rewind_frames = config
            .rewind
            .step_budget_frames
            .max(step_frames_for(av.sample_rate, av.fps));
        let mut ctx = SessionContext::new(rewind_frames);
        ctx.set_flag(SessionFlags::MUTED, config.audio.mute);

        info!(
            "session started: {:.3} fps, audio {:.1} Hz -> {} Hz",
            av.fps, input_rate, config.audio.output_rate
        );

        Ok(Self {
            ctx,
            io,
            video: VideoPipeline::from_config(&config.video),
            audio: AudioPipeline::from_config(&config.audio, input_rate, config.runloop.slowmotion_ratio),
            input: InputPipeline::from_config(&config.input)?,
            rewind_enabled: config.rewind.enable,
        })
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut SessionContext {
        &mut self.ctx
    }

    pub fn collaborators_mut(&mut self) -> &mut Collaborators {
        &mut self.io
    }

    pub fn video(&self) -> &VideoPipeline {
        &self.video
    }

    pub fn audio(&self) -> &AudioPipeline {
        &self.audio
    }

    pub fn mode(&self) -> OperatingMode {
        self.ctx.mode
    }

    /// Callback behavior currently in effect.
    pub fn callbacks(&self) -> CallbackSet {
        CallbackSet::for_mode(self.ctx.mode)
    }

    /// Switch the operating mode. Returns `false` if the mode cannot be
    /// entered with the current configuration and collaborators.
    pub fn set_mode(&mut self, mode: OperatingMode) -> bool {
        if mode == self.ctx.mode {
            return true;
        }
        if mode == OperatingMode::Rewind && !self.rewind_enabled {
            warn!("rewind requested but disabled in config");
            return false;
        }
        if mode.is_netplay() && self.io.netplay.is_none() {
            warn!("{:?} requested without a netplay link", mode);
            return false;
        }
        info!("operating mode {:?} -> {:?}", self.ctx.mode, mode);
        if mode == OperatingMode::Rewind {
            self.ctx.rewind.begin_capture();
        }
        self.ctx.mode = mode;
        true
    }

    pub fn set_pixel_format(&mut self, format: PixelFormat) {
        info!("core pixel format: {:?}", format);
        self.ctx.pixel_format = format;
    }

    /// Start capturing one reverse step's audio.
    pub fn begin_rewind_step(&mut self) {
        self.ctx.rewind.begin_capture();
    }

    /// Play back the audio captured during the step that just ran.
    pub fn end_rewind_step(&mut self) -> Result<(), AudioError> {
        self.audio.flush_rewind(&mut self.ctx, &mut self.io)
    }

    // ========================================================================
    // Core callbacks
    // ========================================================================

    /// `video-refresh`. `None` data means the frame is unchanged.
    pub fn video_refresh(&mut self, data: Option<&[u8]>, width: u32, height: u32, pitch: usize) {
        let frame = match data {
            Some(pixels) => Frame::new(pixels, width, height, pitch),
            None => Frame::dupe(width, height, pitch),
        };
        self.video_refresh_frame(&frame);
    }

    pub fn video_refresh_frame(&mut self, frame: &Frame<'_>) {
        match self.callbacks().video {
            VideoBinding::Netplay if suppress_output(self.io.netplay.as_deref()) => {}
            VideoBinding::Direct | VideoBinding::Netplay => {
                self.video.present(&mut self.ctx, &mut self.io, frame)
            }
        }
    }

    /// `audio-sample`
    pub fn audio_sample(&mut self, left: i16, right: i16) {
        match self.callbacks().audio {
            AudioBinding::Rewind => self.audio.capture_sample(&mut self.ctx, left, right),
            AudioBinding::Netplay if suppress_output(self.io.netplay.as_deref()) => {}
            AudioBinding::Direct | AudioBinding::Netplay => {
                self.audio.sample(&mut self.ctx, &mut self.io, left, right)
            }
        }
    }

    /// `audio-sample-batch`. Returns the number of frames accepted.
    pub fn audio_sample_batch(&mut self, data: &[i16], frames: usize) -> usize {
        let frames = frames.min(data.len() / 2);
        let data = &data[..frames * 2];
        match self.callbacks().audio {
            AudioBinding::Rewind => self.audio.capture_batch(&mut self.ctx, data),
            AudioBinding::Netplay if suppress_output(self.io.netplay.as_deref()) => frames,
            AudioBinding::Direct | AudioBinding::Netplay => {
                self.audio.sample_batch(&mut self.ctx, &mut self.io, data)
            }
        }
    }

    /// `input-poll`
    pub fn input_poll(&mut self) {
        self.input.poll(&mut self.ctx, &mut self.io);
    }

    /// `input-state`
    pub fn input_state(&mut self, port: u32, device: u32, index: u32, id: u32) -> i16 {
        let binding = self.callbacks().input;
        let (ctx, io) = (&mut self.ctx, &mut self.io);
        match binding {
            InputBinding::Direct => self.input.state(ctx, io, port, device, index, id),
            InputBinding::Netplay => self.input.state_netplay(ctx, io, port, device, index, id),
            InputBinding::SpectateHost => {
                self.input.state_spectate_host(ctx, io, port, device, index, id)
            }
            InputBinding::SpectateClient => {
                self.input.state_spectate_client(ctx, io, port, device, index, id)
            }
        }
    }

    /// Re-present the last frame's geometry while the core is not running.
    pub fn redraw(&mut self) -> bool {
        self.video.present_cached(&mut self.ctx, &mut self.io)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Return the session to its start state: flags, mode, overlay, turbo,
    /// rewind cursor, messages and staged audio.
    pub fn teardown(&mut self) {
        info!("session teardown");
        self.ctx.reset();
        self.audio.reset();
    }
}
