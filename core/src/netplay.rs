//! Netplay link interface
//!
//! Transport, synchronization and rollback live outside this crate. The
//! pipelines only need to know whether the current frame is a replayed
//! catch-up frame, and where remote input comes from and goes to.

use crate::session::{OperatingMode, SpectateRole};

/// Connection to the remote peer(s) of a netplay session.
pub trait NetplayLink {
    /// The current frame is being re-simulated; suppress audio and video.
    fn should_skip(&self) -> bool;

    /// Waiting on the remote side; suppress audio and video.
    fn is_stalled(&self) -> bool;

    /// Input of a remote-controlled port.
    fn remote_state(&mut self, port: u32, device: u32, index: u32, id: u32) -> i16;

    /// Forward a local input answer to the peer or spectators.
    fn send_input(&mut self, value: i16);

    /// Next input answer mirrored by a spectated host. `None` once the
    /// connection is cut.
    fn recv_input(&mut self) -> Option<i16>;
}

/// Port driven by the local player in a netplay mode.
///
/// The host plays port 0 and the client port 1. Spectators drive none.
pub fn local_port(mode: OperatingMode) -> Option<u32> {
    match mode {
        OperatingMode::NetplayHost => Some(0),
        OperatingMode::NetplayClient => Some(1),
        OperatingMode::NetplaySpectate(SpectateRole::Host) => None,
        OperatingMode::NetplaySpectate(SpectateRole::Client) => None,
        OperatingMode::Normal | OperatingMode::Rewind => None,
    }
}

/// Whether presentation and audio are suppressed this frame.
pub fn suppress_output(link: Option<&dyn NetplayLink>) -> bool {
    link.is_some_and(|link| link.should_skip() || link.is_stalled())
}
