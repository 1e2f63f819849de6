//! Error types for the callback pipelines

use thiserror::Error;

/// Failure reported by an external collaborator (display, audio device, recorder).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SinkError {
    /// The device rejected the write.
    #[error("sink write failed: {0}")]
    Write(String),
    /// The device went away.
    #[error("sink disconnected")]
    Disconnected,
}

/// Failure of one audio flush.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioError {
    /// Audio delivery was disabled by an earlier failure, or no sink is attached.
    #[error("audio sink inactive")]
    Inactive,
    /// The sink rejected this write; delivery is now disabled for the session.
    #[error("audio write failed: {0}")]
    WriteFailed(#[from] SinkError),
}

/// Rewind capture would run past the start of the step buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rewind buffer overflow: {requested} samples requested, {remaining} remaining")]
pub struct RewindError {
    pub requested: usize,
    pub remaining: usize,
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("unknown bind name `{0}`")]
    UnknownBind(String),
}

/// A threaded sink's worker is no longer reachable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
    #[error("worker thread disconnected")]
    Disconnected,
}

impl From<WorkerError> for SinkError {
    fn from(_: WorkerError) -> Self {
        SinkError::Disconnected
    }
}
