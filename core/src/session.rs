//! Per-session context shared by all pipelines
//!
//! Everything the pipelines mutate between calls lives here: delivery
//! flags, the operating mode, overlay and turbo state, the rewind buffer
//! and the message queue. The frontend owns one context per session and
//! passes it by reference into every pipeline call; all mutation happens
//! on the thread driving the core.

use retrolink_shared::PixelFormat;

use crate::input::overlay::OverlayState;
use crate::input::turbo::TurboState;
use crate::messages::MessageQueue;
use crate::rewind::RewindBuffer;

bitflags::bitflags! {
    /// Session-wide switches consulted at the start of each call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SessionFlags: u16 {
        /// Video frames reach the display. Cleared on presentation failure.
        const VIDEO_ACTIVE = 1 << 0;
        /// Audio reaches the device. Cleared on write failure.
        const AUDIO_ACTIVE = 1 << 1;
        const PAUSED = 1 << 2;
        const MUTED = 1 << 3;
        const SLOWMOTION = 1 << 4;
        /// Transient after a menu toggle: all input reads as released.
        const FLUSHING_INPUT = 1 << 5;
        /// Core-facing input is blocked (hotkey handling in progress).
        const BLOCK_INPUT = 1 << 6;
        /// Movie playback ran out; live input is used from now on.
        const MOVIE_END = 1 << 7;
    }
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self::VIDEO_ACTIVE | Self::AUDIO_ACTIVE
    }
}

/// Which side of a spectated session this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectateRole {
    /// Plays locally and mirrors input to spectators.
    Host,
    /// Replays the host's input.
    Client,
}

/// Active operating mode. Exactly one is active; switches are discrete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatingMode {
    #[default]
    Normal,
    /// Reverse stepping: audio is captured into the rewind buffer.
    Rewind,
    NetplayHost,
    NetplayClient,
    NetplaySpectate(SpectateRole),
}

impl OperatingMode {
    pub fn is_netplay(self) -> bool {
        matches!(
            self,
            Self::NetplayHost | Self::NetplayClient | Self::NetplaySpectate(_)
        )
    }
}

/// Geometry of the last frame handed to the video pipeline.
///
/// Pixel memory is owned by the core and is never kept past the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCache {
    pub width: u32,
    pub height: u32,
    pub pitch: usize,
}

/// Mutable state of one emulation session.
#[derive(Debug)]
pub struct SessionContext {
    pub flags: SessionFlags,
    pub mode: OperatingMode,
    pub pixel_format: PixelFormat,
    pub overlay: OverlayState,
    pub turbo: TurboState,
    pub rewind: RewindBuffer,
    pub messages: MessageQueue,
    pub frame_cache: Option<FrameCache>,
}

impl SessionContext {
    /// Create a context whose rewind buffer holds `rewind_step_frames`
    /// stereo frames, the audio budget of one rewind step.
    pub fn new(rewind_step_frames: usize) -> Self {
        Self {
            flags: SessionFlags::default(),
            mode: OperatingMode::Normal,
            pixel_format: PixelFormat::default(),
            overlay: OverlayState::default(),
            turbo: TurboState::default(),
            rewind: RewindBuffer::for_step(rewind_step_frames),
            messages: MessageQueue::default(),
            frame_cache: None,
        }
    }

    pub fn is_video_active(&self) -> bool {
        self.flags.contains(SessionFlags::VIDEO_ACTIVE)
    }

    pub fn is_audio_active(&self) -> bool {
        self.flags.contains(SessionFlags::AUDIO_ACTIVE)
    }

    pub fn set_flag(&mut self, flag: SessionFlags, on: bool) {
        self.flags.set(flag, on);
    }

    /// Return everything to its session-start state.
    ///
    /// The rewind buffer keeps its capacity; only the cursor resets.
    pub fn reset(&mut self) {
        self.flags = SessionFlags::default();
        self.mode = OperatingMode::Normal;
        self.overlay = OverlayState::default();
        self.turbo = TurboState::default();
        self.rewind.begin_capture();
        self.messages.clear();
        self.frame_cache = None;
    }
}
