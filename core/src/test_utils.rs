//! Shared test utilities for integration and unit tests

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use retrolink_shared::{DEVICE_MASK, DEVICE_POINTER, DEVICE_POINTER_SCREEN, POINTER_ID_PRESSED, POINTER_ID_X, POINTER_ID_Y};

use crate::error::SinkError;
use crate::input::binds::PortBinds;
use crate::input::movie::Movie;
use crate::input::overlay::OverlayState;
use crate::netplay::NetplayLink;
use crate::sinks::{
    AudioBuffer, AudioSink, CommandPoller, Frame, InputDriver, KeyEvent, KeyboardListener,
    MovieTape, Overlay, RecordingSink, VideoSink,
};

// ============================================================================
// Shared handle
// ============================================================================

/// Lets a test keep inspecting a collaborator after boxing it into
/// [`crate::sinks::Collaborators`].
pub struct Shared<T>(Rc<RefCell<T>>);

impl<T> Shared<T> {
    pub fn new(inner: T) -> Self {
        Self(Rc::new(RefCell::new(inner)))
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    pub fn boxed(&self) -> Box<Self> {
        Box::new(self.clone())
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

// ============================================================================
// Input driver
// ============================================================================

/// Input driver answering from a table, plus a list of pointer contacts.
#[derive(Default)]
pub struct ScriptedDriver {
    /// `(port, device, index, id) -> value`
    pub values: HashMap<(u32, u32, u32, u32), i16>,
    /// Active pointer contacts, by contact index.
    pub contacts: Vec<(i16, i16)>,
    /// Only report contacts through the screen-space pointer device.
    pub screen_only: bool,
    pub polls: usize,
    pub queries: usize,
}

impl ScriptedDriver {
    pub fn set(&mut self, port: u32, device: u32, index: u32, id: u32, value: i16) {
        self.values.insert((port, device, index, id), value);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    fn pointer(&self, device: u32, index: u32, id: u32) -> i16 {
        if self.screen_only && device != DEVICE_POINTER_SCREEN {
            return 0;
        }
        let Some(&(x, y)) = self.contacts.get(index as usize) else {
            return 0;
        };
        match id {
            POINTER_ID_X => x,
            POINTER_ID_Y => y,
            POINTER_ID_PRESSED => 1,
            _ => 0,
        }
    }
}

impl InputDriver for ScriptedDriver {
    fn poll(&mut self) {
        self.polls += 1;
    }

    fn state(&mut self, _binds: Option<&PortBinds>, port: u32, device: u32, index: u32, id: u32) -> i16 {
        if device & DEVICE_MASK == DEVICE_POINTER {
            return self.pointer(device, index, id);
        }
        self.queries += 1;
        self.values.get(&(port, device, index, id)).copied().unwrap_or(0)
    }
}

// ============================================================================
// Overlay and keyboard
// ============================================================================

/// Overlay whose hit test is keyed by the contact's x coordinate.
pub struct FakeOverlay {
    pub alive: bool,
    pub full_screen: bool,
    pub by_x: HashMap<i16, OverlayState>,
    pub post_polls: usize,
    pub clears: usize,
}

impl FakeOverlay {
    pub fn new() -> Self {
        Self {
            alive: true,
            full_screen: false,
            by_x: HashMap::new(),
            post_polls: 0,
            clears: 0,
        }
    }
}

impl Overlay for FakeOverlay {
    fn is_alive(&self) -> bool {
        self.alive
    }

    fn is_full_screen(&self) -> bool {
        self.full_screen
    }

    fn poll(&mut self, x: i16, _y: i16) -> OverlayState {
        self.by_x.get(&x).copied().unwrap_or_default()
    }

    fn post_poll(&mut self, _opacity: f32) {
        self.post_polls += 1;
    }

    fn poll_clear(&mut self, _opacity: f32) {
        self.clears += 1;
    }
}

#[derive(Default)]
pub struct RecordingKeyboard {
    pub events: Vec<KeyEvent>,
}

impl KeyboardListener for RecordingKeyboard {
    fn key_event(&mut self, event: KeyEvent) {
        self.events.push(event);
    }
}

#[derive(Default)]
pub struct CountingCommand {
    pub polls: usize,
}

impl CommandPoller for CountingCommand {
    fn poll(&mut self) {
        self.polls += 1;
    }
}

/// Movie player that counts how often playback is read.
pub struct CountingTape {
    pub tape: Movie,
    pub reads: usize,
}

impl CountingTape {
    pub fn player(values: Vec<i16>) -> Self {
        Self {
            tape: Movie::player(values),
            reads: 0,
        }
    }
}

impl MovieTape for CountingTape {
    fn is_playback(&self) -> bool {
        self.tape.is_playback()
    }

    fn get_input(&mut self) -> Option<i16> {
        self.reads += 1;
        self.tape.get_input()
    }

    fn set_input(&mut self, value: i16) {
        self.tape.set_input(value);
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Geometry and pixels of one presented or recorded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SeenFrame {
    pub width: u32,
    pub height: u32,
    pub pitch: usize,
    /// `None` for dupe/hardware sentinels.
    pub pixels: Option<Vec<u8>>,
}

impl SeenFrame {
    fn from_frame(frame: &Frame<'_>) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            pitch: frame.pitch,
            pixels: frame.pixels().map(<[u8]>::to_vec),
        }
    }
}

#[derive(Default)]
pub struct RecordingVideo {
    pub frames: Vec<SeenFrame>,
    pub messages: Vec<Option<String>>,
    /// Report presentation failure.
    pub fail: bool,
}

impl VideoSink for RecordingVideo {
    fn present(&mut self, frame: &Frame<'_>, message: Option<&str>) -> bool {
        self.frames.push(SeenFrame::from_frame(frame));
        self.messages.push(message.map(str::to_string));
        !self.fail
    }
}

pub struct RecordingAudio {
    pub float: Vec<f32>,
    pub s16: Vec<i16>,
    pub writes: usize,
    pub accepts_float: bool,
    pub fail: bool,
    /// `(write_avail, buffer_size)` in samples.
    pub space: Option<(usize, usize)>,
}

impl Default for RecordingAudio {
    fn default() -> Self {
        Self {
            float: Vec::new(),
            s16: Vec::new(),
            writes: 0,
            accepts_float: true,
            fail: false,
            space: None,
        }
    }
}

impl RecordingAudio {
    pub fn frames_written(&self) -> usize {
        (self.float.len() + self.s16.len()) / 2
    }
}

impl AudioSink for RecordingAudio {
    fn write(&mut self, buffer: AudioBuffer<'_>) -> Result<usize, SinkError> {
        if self.fail {
            return Err(SinkError::Write("device lost".into()));
        }
        self.writes += 1;
        match buffer {
            AudioBuffer::Float(s) => self.float.extend_from_slice(s),
            AudioBuffer::S16(s) => self.s16.extend_from_slice(s),
        }
        Ok(buffer.frames())
    }

    fn accepts_float(&self) -> bool {
        self.accepts_float
    }

    fn write_avail(&self) -> Option<usize> {
        self.space.map(|(avail, _)| avail)
    }

    fn buffer_size(&self) -> Option<usize> {
        self.space.map(|(_, size)| size)
    }
}

#[derive(Default)]
pub struct RecordingRecorder {
    pub frames: Vec<SeenFrame>,
    pub audio: Vec<i16>,
}

impl RecordingSink for RecordingRecorder {
    fn dump_frame(&mut self, frame: &Frame<'_>) {
        self.frames.push(SeenFrame::from_frame(frame));
    }

    fn push_audio(&mut self, samples: &[i16]) {
        self.audio.extend_from_slice(samples);
    }
}

// ============================================================================
// Netplay
// ============================================================================

#[derive(Default)]
pub struct ScriptedLink {
    pub skip: bool,
    pub stall: bool,
    pub remote: HashMap<(u32, u32, u32, u32), i16>,
    pub sent: Vec<i16>,
    /// Answers of a spectated host; running dry means the link is cut.
    pub incoming: VecDeque<i16>,
}

impl NetplayLink for ScriptedLink {
    fn should_skip(&self) -> bool {
        self.skip
    }

    fn is_stalled(&self) -> bool {
        self.stall
    }

    fn remote_state(&mut self, port: u32, device: u32, index: u32, id: u32) -> i16 {
        self.remote.get(&(port, device, index, id)).copied().unwrap_or(0)
    }

    fn send_input(&mut self, value: i16) {
        self.sent.push(value);
    }

    fn recv_input(&mut self) -> Option<i16> {
        self.incoming.pop_front()
    }
}

// ============================================================================
// Delegation for shared handles
// ============================================================================

impl<T: InputDriver> InputDriver for Shared<T> {
    fn poll(&mut self) {
        self.0.borrow_mut().poll();
    }

    fn state(&mut self, binds: Option<&PortBinds>, port: u32, device: u32, index: u32, id: u32) -> i16 {
        self.0.borrow_mut().state(binds, port, device, index, id)
    }
}

impl<T: Overlay> Overlay for Shared<T> {
    fn is_alive(&self) -> bool {
        self.0.borrow().is_alive()
    }

    fn is_full_screen(&self) -> bool {
        self.0.borrow().is_full_screen()
    }

    fn poll(&mut self, x: i16, y: i16) -> OverlayState {
        self.0.borrow_mut().poll(x, y)
    }

    fn post_poll(&mut self, opacity: f32) {
        self.0.borrow_mut().post_poll(opacity);
    }

    fn poll_clear(&mut self, opacity: f32) {
        self.0.borrow_mut().poll_clear(opacity);
    }
}

impl<T: KeyboardListener> KeyboardListener for Shared<T> {
    fn key_event(&mut self, event: KeyEvent) {
        self.0.borrow_mut().key_event(event);
    }
}

impl<T: CommandPoller> CommandPoller for Shared<T> {
    fn poll(&mut self) {
        self.0.borrow_mut().poll();
    }
}

impl<T: VideoSink> VideoSink for Shared<T> {
    fn present(&mut self, frame: &Frame<'_>, message: Option<&str>) -> bool {
        self.0.borrow_mut().present(frame, message)
    }
}

impl<T: AudioSink> AudioSink for Shared<T> {
    fn write(&mut self, buffer: AudioBuffer<'_>) -> Result<usize, SinkError> {
        self.0.borrow_mut().write(buffer)
    }

    fn accepts_float(&self) -> bool {
        self.0.borrow().accepts_float()
    }

    fn write_avail(&self) -> Option<usize> {
        self.0.borrow().write_avail()
    }

    fn buffer_size(&self) -> Option<usize> {
        self.0.borrow().buffer_size()
    }
}

impl<T: RecordingSink> RecordingSink for Shared<T> {
    fn dump_frame(&mut self, frame: &Frame<'_>) {
        self.0.borrow_mut().dump_frame(frame);
    }

    fn push_audio(&mut self, samples: &[i16]) {
        self.0.borrow_mut().push_audio(samples);
    }
}

impl<T: MovieTape> MovieTape for Shared<T> {
    fn is_playback(&self) -> bool {
        self.0.borrow().is_playback()
    }

    fn get_input(&mut self) -> Option<i16> {
        self.0.borrow_mut().get_input()
    }

    fn set_input(&mut self, value: i16) {
        self.0.borrow_mut().set_input(value);
    }
}

impl<T: NetplayLink> NetplayLink for Shared<T> {
    fn should_skip(&self) -> bool {
        self.0.borrow().should_skip()
    }

    fn is_stalled(&self) -> bool {
        self.0.borrow().is_stalled()
    }

    fn remote_state(&mut self, port: u32, device: u32, index: u32, id: u32) -> i16 {
        self.0.borrow_mut().remote_state(port, device, index, id)
    }

    fn send_input(&mut self, value: i16) {
        self.0.borrow_mut().send_input(value);
    }

    fn recv_input(&mut self) -> Option<i16> {
        self.0.borrow_mut().recv_input()
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Handles to every scripted collaborator of a test session.
pub struct TestRig {
    pub driver: Shared<ScriptedDriver>,
    pub video: Shared<RecordingVideo>,
    pub audio: Shared<RecordingAudio>,
    pub recorder: Shared<RecordingRecorder>,
}

impl TestRig {
    pub fn new() -> Self {
        Self {
            driver: Shared::new(ScriptedDriver::default()),
            video: Shared::new(RecordingVideo::default()),
            audio: Shared::new(RecordingAudio::default()),
            recorder: Shared::new(RecordingRecorder::default()),
        }
    }

    /// Collaborators wired to the rig's driver and sinks.
    pub fn collaborators(&self) -> crate::sinks::Collaborators {
        crate::sinks::Collaborators::new(self.driver.boxed())
            .with_video(self.video.boxed())
            .with_audio(self.audio.boxed())
            .with_recorder(self.recorder.boxed())
    }
}

/// Interleaved stereo ramp, `frames` frames long.
pub fn stereo_ramp(frames: usize) -> Vec<i16> {
    (0..frames)
        .flat_map(|i| {
            let v = (i as i16).wrapping_mul(64);
            [v, v.wrapping_neg()]
        })
        .collect()
}
