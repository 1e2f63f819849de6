//! Retrolink Core - callback dispatch between an emulation core and a frontend
//!
//! Every frame, audio sample and input query the core produces or requests
//! passes through this crate on its way to (or from) the display, the audio
//! device, the recorder and the input devices.
//!
//! # Architecture
//!
//! - [`Frontend`] - Stable core-facing entry points, dispatched per [`OperatingMode`]
//! - [`VideoPipeline`] - Pixel format conversion, software filter, recording tap
//! - [`AudioPipeline`] - s16 to float, DSP, resampling, rate control, rewind capture
//! - [`InputPipeline`] - Remap, overlay fusion, turbo, movie and netplay layering
//! - [`SessionContext`] - Per-session state passed into every pipeline call
//! - [`Collaborators`] - Display, audio device, recorder and input sources

pub mod audio;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod dsp;
pub mod error;
pub mod input;
#[cfg(test)]
mod integration;
pub mod messages;
pub mod netplay;
pub mod perf;
pub mod resampler;
pub mod rewind;
pub mod session;
pub mod sinks;
#[cfg(test)]
pub mod test_utils;
pub mod video;
pub mod worker;

// Re-export the session surface
pub use dispatch::{AudioBinding, AvInfo, CallbackSet, Frontend, InputBinding, VideoBinding};
pub use session::{OperatingMode, SessionContext, SessionFlags, SpectateRole};

// Re-export pipelines
pub use audio::{AudioConfig, AudioPipeline};
pub use input::{InputConfig, InputPipeline};
pub use video::{VideoConfig, VideoPipeline};

// Re-export collaborator traits and payloads
pub use netplay::NetplayLink;
pub use sinks::{
    AudioBuffer, AudioSink, Collaborators, CommandPoller, Frame, FrameData, InputDriver, KeyEvent,
    KeyboardListener, MovieTape, Overlay, RecordingSink, VideoSink,
};

// Re-export configuration and errors
pub use config::Config;
pub use error::{AudioError, ConfigError, RewindError, SinkError, WorkerError};

// Re-export ready-made collaborators
pub use audio::ring_sink::RingAudioSink;
pub use input::movie::{Movie, MovieMode};
pub use worker::{ThreadedAudioSink, ThreadedVideoSink};
