//! Collaborator interfaces consumed by the pipelines
//!
//! The pipelines never own a display, an audio device, a recorder or an
//! input device. They talk to them through the traits here, and the
//! frontend hands the concrete implementations over in [`Collaborators`].

use retrolink_shared::KeyModifiers;

use crate::error::SinkError;
use crate::input::binds::PortBinds;
use crate::input::overlay::OverlayState;
use crate::netplay::NetplayLink;

// ============================================================================
// Borrowed payloads
// ============================================================================

/// Pixel payload of one video callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameData<'a> {
    /// Raw pixel rows owned by the core, valid for this call only.
    Pixels(&'a [u8]),
    /// "Frame unchanged": the sink should re-present its last frame.
    Dupe,
    /// The core rendered into a hardware framebuffer.
    Hardware,
}

/// Borrowed view of one frame: pixels plus geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub data: FrameData<'a>,
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes.
    pub pitch: usize,
}

impl<'a> Frame<'a> {
    pub fn new(pixels: &'a [u8], width: u32, height: u32, pitch: usize) -> Self {
        Self {
            data: FrameData::Pixels(pixels),
            width,
            height,
            pitch,
        }
    }

    pub fn dupe(width: u32, height: u32, pitch: usize) -> Self {
        Self {
            data: FrameData::Dupe,
            width,
            height,
            pitch,
        }
    }

    /// Pixel rows, or `None` for the dupe and hardware sentinels.
    pub fn pixels(&self) -> Option<&'a [u8]> {
        match self.data {
            FrameData::Pixels(p) => Some(p),
            FrameData::Dupe | FrameData::Hardware => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.pixels().is_none()
    }
}

/// Interleaved stereo samples handed to an audio sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioBuffer<'a> {
    Float(&'a [f32]),
    S16(&'a [i16]),
}

impl AudioBuffer<'_> {
    /// Stereo frames in the buffer.
    pub fn frames(&self) -> usize {
        match self {
            Self::Float(s) => s.len() / 2,
            Self::S16(s) => s.len() / 2,
        }
    }

    /// Raw byte view, for sinks that forward to byte-oriented devices.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Float(s) => bytemuck::cast_slice(s),
            Self::S16(s) => bytemuck::cast_slice(s),
        }
    }
}

/// Keyboard edge produced by the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub down: bool,
    pub code: u32,
    pub character: u32,
    pub modifiers: KeyModifiers,
    pub device: u32,
}

// ============================================================================
// Sinks
// ============================================================================

/// Display side of the video pipeline.
pub trait VideoSink {
    /// Present a frame with an optional status message. `false` means the
    /// display is gone and video delivery should stop.
    fn present(&mut self, frame: &Frame<'_>, message: Option<&str>) -> bool;
}

/// Audio device side of the audio pipeline.
pub trait AudioSink {
    /// Write interleaved stereo samples. Returns frames consumed.
    fn write(&mut self, buffer: AudioBuffer<'_>) -> Result<usize, SinkError>;

    /// Whether the device takes `f32` samples directly.
    fn accepts_float(&self) -> bool {
        true
    }

    /// Free space in samples, for dynamic rate control.
    fn write_avail(&self) -> Option<usize> {
        None
    }

    /// Total buffer size in samples, for dynamic rate control.
    fn buffer_size(&self) -> Option<usize> {
        None
    }
}

/// Video/audio recorder tap.
pub trait RecordingSink {
    fn dump_frame(&mut self, frame: &Frame<'_>);
    /// Interleaved stereo samples exactly as the core produced them.
    fn push_audio(&mut self, samples: &[i16]);
}

// ============================================================================
// Input sources
// ============================================================================

/// Physical input device driver.
pub trait InputDriver {
    fn poll(&mut self);
    /// `binds` is `None` for raw device queries (pointer contacts).
    fn state(
        &mut self,
        binds: Option<&PortBinds>,
        port: u32,
        device: u32,
        index: u32,
        id: u32,
    ) -> i16;
}

/// Deterministic input movie.
pub trait MovieTape {
    /// Whether the tape is playing back (as opposed to recording).
    fn is_playback(&self) -> bool;
    /// Next recorded value, `None` once the tape is exhausted.
    fn get_input(&mut self) -> Option<i16>;
    /// Append a value while recording.
    fn set_input(&mut self, value: i16);
}

/// On-screen overlay hit testing.
pub trait Overlay {
    fn is_alive(&self) -> bool;
    /// Full-screen overlays are queried through the screen-space pointer.
    fn is_full_screen(&self) -> bool;
    /// Buttons, keys and axes covered by a contact at `(x, y)`.
    fn poll(&mut self, x: i16, y: i16) -> OverlayState;
    /// Called after a poll with at least one contact.
    fn post_poll(&mut self, opacity: f32);
    /// Called after a poll with no contacts.
    fn poll_clear(&mut self, opacity: f32);
}

/// Receiver of synthesized keyboard events.
pub trait KeyboardListener {
    fn key_event(&mut self, event: KeyEvent);
}

/// Out-of-band command channel serviced once per poll.
pub trait CommandPoller {
    fn poll(&mut self);
}

// ============================================================================
// Bundle
// ============================================================================

/// Every external collaborator of one session.
pub struct Collaborators {
    pub video: Option<Box<dyn VideoSink>>,
    pub audio: Option<Box<dyn AudioSink>>,
    pub recorder: Option<Box<dyn RecordingSink>>,
    pub input: Box<dyn InputDriver>,
    pub movie: Option<Box<dyn MovieTape>>,
    pub overlay: Option<Box<dyn Overlay>>,
    pub keyboard: Option<Box<dyn KeyboardListener>>,
    pub command: Option<Box<dyn CommandPoller>>,
    pub netplay: Option<Box<dyn NetplayLink>>,
}

impl Collaborators {
    /// Collaborators with only an input driver attached.
    pub fn new(input: Box<dyn InputDriver>) -> Self {
        Self {
            video: None,
            audio: None,
            recorder: None,
            input,
            movie: None,
            overlay: None,
            keyboard: None,
            command: None,
            netplay: None,
        }
    }

    pub fn with_video(mut self, video: Box<dyn VideoSink>) -> Self {
        self.video = Some(video);
        self
    }

    pub fn with_audio(mut self, audio: Box<dyn AudioSink>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_recorder(mut self, recorder: Box<dyn RecordingSink>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_movie(mut self, movie: Box<dyn MovieTape>) -> Self {
        self.movie = Some(movie);
        self
    }

    pub fn with_overlay(mut self, overlay: Box<dyn Overlay>) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn with_keyboard(mut self, keyboard: Box<dyn KeyboardListener>) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn with_command(mut self, command: Box<dyn CommandPoller>) -> Self {
        self.command = Some(command);
        self
    }

    pub fn with_netplay(mut self, netplay: Box<dyn NetplayLink>) -> Self {
        self.netplay = Some(netplay);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_frames_have_no_pixels() {
        let pixels = [0u8; 8];
        assert!(!Frame::new(&pixels, 2, 2, 4).is_sentinel());
        assert!(Frame::dupe(2, 2, 4).is_sentinel());
        let hw = Frame {
            data: FrameData::Hardware,
            ..Frame::dupe(2, 2, 4)
        };
        assert_eq!(hw.pixels(), None);
    }

    #[test]
    fn test_audio_buffer_views() {
        let s16 = AudioBuffer::S16(&[1, 2, 3, 4]);
        assert_eq!(s16.frames(), 2);
        assert_eq!(s16.as_bytes().len(), 8);
        assert_eq!(AudioBuffer::Float(&[0.0; 6]).as_bytes().len(), 24);
    }
}
