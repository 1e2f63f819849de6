//! Threaded sinks
//!
//! Wrap a display or audio device in a named worker thread. Each call sends
//! one typed command and blocks on its reply, so the device keeps its own
//! thread while the core still sees the result of the call it made.
//! Payloads are copied out of the callback's borrowed buffers before they
//! cross the channel.
//!
//! ```text
//! Core Thread                      Worker Thread
//!     │                                 │
//! [present/write]──(sync_channel)──►[inner sink]
//!     │◄──────────(status reply)────────│
//! ```
//!
//! A device failure is returned from the same call that triggered it.

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::error::{SinkError, WorkerError};
use crate::sinks::{AudioBuffer, AudioSink, Frame, FrameData, VideoSink};

/// Bound of the command channel.
pub const WORKER_QUEUE_DEPTH: usize = 4;

// ============================================================================
// Owned payloads
// ============================================================================

#[derive(Debug, Clone)]
enum OwnedFrameData {
    Pixels(Vec<u8>),
    Dupe,
    Hardware,
}

/// A frame copied out of the core's buffer.
#[derive(Debug, Clone)]
struct OwnedFrame {
    data: OwnedFrameData,
    width: u32,
    height: u32,
    pitch: usize,
}

impl OwnedFrame {
    fn copy_of(frame: &Frame<'_>) -> Self {
        let data = match frame.data {
            FrameData::Pixels(p) => OwnedFrameData::Pixels(p.to_vec()),
            FrameData::Dupe => OwnedFrameData::Dupe,
            FrameData::Hardware => OwnedFrameData::Hardware,
        };
        Self {
            data,
            width: frame.width,
            height: frame.height,
            pitch: frame.pitch,
        }
    }

    fn as_frame(&self) -> Frame<'_> {
        let data = match &self.data {
            OwnedFrameData::Pixels(p) => FrameData::Pixels(p),
            OwnedFrameData::Dupe => FrameData::Dupe,
            OwnedFrameData::Hardware => FrameData::Hardware,
        };
        Frame {
            data,
            width: self.width,
            height: self.height,
            pitch: self.pitch,
        }
    }
}

#[derive(Debug, Clone)]
enum OwnedAudio {
    Float(Vec<f32>),
    S16(Vec<i16>),
}

impl OwnedAudio {
    fn copy_of(buffer: &AudioBuffer<'_>) -> Self {
        match *buffer {
            AudioBuffer::Float(s) => Self::Float(s.to_vec()),
            AudioBuffer::S16(s) => Self::S16(s.to_vec()),
        }
    }

    fn as_buffer(&self) -> AudioBuffer<'_> {
        match self {
            Self::Float(s) => AudioBuffer::Float(s),
            Self::S16(s) => AudioBuffer::S16(s),
        }
    }
}

/// Sender plus join handle; dropping it stops and joins the worker.
struct Worker<C> {
    tx: Option<SyncSender<C>>,
    handle: Option<JoinHandle<()>>,
}

impl<C: Send + 'static> Worker<C> {
    fn spawn(name: &str, body: impl FnOnce(Receiver<C>) + Send + 'static) -> Result<Self, WorkerError> {
        let (tx, rx) = mpsc::sync_channel::<C>(WORKER_QUEUE_DEPTH);
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || body(rx))
            .map_err(|e| WorkerError::Spawn(e.to_string()))?;
        debug!("spawned {} worker", name);
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    fn send(&self, command: C) -> Result<(), WorkerError> {
        let tx = self.tx.as_ref().ok_or(WorkerError::Disconnected)?;
        tx.send(command).map_err(|_| WorkerError::Disconnected)
    }
}

impl<C> Drop for Worker<C> {
    fn drop(&mut self) {
        // The worker exits once its receiver disconnects; drop the sender before joining.
        drop(self.tx.take());
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("sink worker panicked");
        }
    }
}

// ============================================================================
// Video
// ============================================================================

enum VideoCommand {
    Present {
        frame: OwnedFrame,
        message: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VideoReply {
    Presented(bool),
}

/// [`VideoSink`] running on its own thread.
pub struct ThreadedVideoSink {
    worker: Worker<VideoCommand>,
    replies: Receiver<VideoReply>,
    alive: bool,
}

impl ThreadedVideoSink {
    pub fn spawn<S: VideoSink + Send + 'static>(mut inner: S) -> Result<Self, WorkerError> {
        let (reply_tx, replies) = mpsc::channel();
        let worker = Worker::spawn("video-sink", move |rx: Receiver<VideoCommand>| {
            while let Ok(command) = rx.recv() {
                let reply = match command {
                    VideoCommand::Present { frame, message } => {
                        VideoReply::Presented(inner.present(&frame.as_frame(), message.as_deref()))
                    }
                };
                if reply_tx.send(reply).is_err() {
                    break;
                }
            }
        })?;
        Ok(Self {
            worker,
            replies,
            alive: true,
        })
    }

    fn round_trip(&self, command: VideoCommand) -> Result<VideoReply, WorkerError> {
        self.worker.send(command)?;
        self.replies.recv().map_err(|_| WorkerError::Disconnected)
    }
}

impl VideoSink for ThreadedVideoSink {
    fn present(&mut self, frame: &Frame<'_>, message: Option<&str>) -> bool {
        if !self.alive {
            return false;
        }
        let command = VideoCommand::Present {
            frame: OwnedFrame::copy_of(frame),
            message: message.map(str::to_string),
        };
        match self.round_trip(command) {
            Ok(VideoReply::Presented(ok)) => self.alive = ok,
            Err(_) => {
                warn!("video sink worker is gone");
                self.alive = false;
            }
        }
        self.alive
    }
}

// ============================================================================
// Audio
// ============================================================================

enum AudioCommand {
    Write(OwnedAudio),
}

/// Device state reported after each write.
#[derive(Debug, Clone)]
enum AudioReply {
    Written {
        result: Result<usize, SinkError>,
        write_avail: Option<usize>,
        buffer_size: Option<usize>,
    },
}

/// [`AudioSink`] running on its own thread.
pub struct ThreadedAudioSink {
    worker: Worker<AudioCommand>,
    replies: Receiver<AudioReply>,
    accepts_float: bool,
    write_avail: Option<usize>,
    buffer_size: Option<usize>,
}

impl ThreadedAudioSink {
    pub fn spawn<S: AudioSink + Send + 'static>(mut inner: S) -> Result<Self, WorkerError> {
        let accepts_float = inner.accepts_float();
        let write_avail = inner.write_avail();
        let buffer_size = inner.buffer_size();
        let (reply_tx, replies) = mpsc::channel();
        let worker = Worker::spawn("audio-sink", move |rx: Receiver<AudioCommand>| {
            while let Ok(command) = rx.recv() {
                let reply = match command {
                    AudioCommand::Write(samples) => AudioReply::Written {
                        result: inner.write(samples.as_buffer()),
                        write_avail: inner.write_avail(),
                        buffer_size: inner.buffer_size(),
                    },
                };
                if reply_tx.send(reply).is_err() {
                    break;
                }
            }
        })?;
        Ok(Self {
            worker,
            replies,
            accepts_float,
            write_avail,
            buffer_size,
        })
    }
}

impl AudioSink for ThreadedAudioSink {
    fn write(&mut self, buffer: AudioBuffer<'_>) -> Result<usize, SinkError> {
        self.worker.send(AudioCommand::Write(OwnedAudio::copy_of(&buffer)))?;
        let AudioReply::Written {
            result,
            write_avail,
            buffer_size,
        } = self.replies.recv().map_err(|_| SinkError::Disconnected)?;
        self.write_avail = write_avail;
        self.buffer_size = buffer_size;
        result
    }

    fn accepts_float(&self) -> bool {
        self.accepts_float
    }

    fn write_avail(&self) -> Option<usize> {
        self.write_avail
    }

    fn buffer_size(&self) -> Option<usize> {
        self.buffer_size
    }
}
