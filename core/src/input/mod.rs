//! Input aggregation pipeline
//!
//! `poll` refreshes everything derived from the devices once per frame.
//! `state` answers one core query by layering, in order: movie playback,
//! remapping, the base driver (or the netplay link), the overlay, the
//! flush override, turbo, and finally movie recording.

pub mod binds;
pub mod movie;
pub mod overlay;
pub mod turbo;


use hashbrown::HashMap;
use retrolink_shared::{
    DEVICE_ANALOG, DEVICE_JOYPAD, DEVICE_KEYBOARD, DEVICE_MASK, FIRST_CUSTOM_BIND, FIRST_META_KEY,
    MAX_PORTS, TURBO_ENABLE, analog_slot, is_dpad,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::ConfigError;
use crate::session::{OperatingMode, SessionContext, SessionFlags};
use crate::sinks::{Collaborators, KeyboardListener};

use binds::{PortBinds, RemapTable};
use overlay::{AnalogDpadMode, OverlaySettings, poll_overlay};
use turbo::TurboSettings;

/// Message shown when a spectated host goes away.
pub const SPECTATE_LOST_MESSAGE: &str = "Connection with host was cut.";

/// Input configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Turbo pulse length in polls.
    #[serde(default = "default_turbo_period")]
    pub turbo_period: u32,

    /// Polls per pulse during which a turbo button reads as pressed.
    #[serde(default = "default_turbo_duty_cycle")]
    pub turbo_duty_cycle: u32,

    /// Stick deflection (0.0-1.0) that counts as a d-pad press.
    #[serde(default = "default_axis_threshold")]
    pub axis_threshold: f32,

    /// Stick used as a virtual d-pad, per port. Missing ports use none.
    #[serde(default)]
    pub analog_dpad_mode: Vec<AnalogDpadMode>,

    #[serde(default)]
    pub remap_binds_enable: bool,

    /// Per-port `core button -> physical button` substitutions.
    #[serde(default)]
    pub remap: Vec<HashMap<String, String>>,

    /// Per-port `bind name -> host key` tables handed to the input driver.
    #[serde(default)]
    pub binds: Vec<HashMap<String, String>>,

    #[serde(default = "default_overlay_opacity")]
    pub overlay_opacity: f32,
}

fn default_turbo_period() -> u32 {
    6
}
fn default_turbo_duty_cycle() -> u32 {
    3
}
fn default_axis_threshold() -> f32 {
    0.5
}
fn default_overlay_opacity() -> f32 {
    0.7
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            turbo_period: default_turbo_period(),
            turbo_duty_cycle: default_turbo_duty_cycle(),
            axis_threshold: default_axis_threshold(),
            analog_dpad_mode: Vec::new(),
            remap_binds_enable: false,
            remap: Vec::new(),
            binds: Vec::new(),
            overlay_opacity: default_overlay_opacity(),
        }
    }
}

/// Where step 3 of a state query reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BaseSource {
    /// The local input driver for every port.
    Local,
    /// Local driver for `local_port`, the netplay link for the others.
    Netplay { local_port: u32 },
}

/// Per-query behavior switches resolved from the operating mode.
#[derive(Debug, Clone, Copy)]
struct Query {
    source: BaseSource,
    /// Movie playback and recording take part in this query.
    use_movie: bool,
}

/// Input aggregation pipeline
pub struct InputPipeline {
    turbo: TurboSettings,
    overlay: OverlaySettings,
    remap_enable: bool,
    remap: RemapTable,
    binds: Vec<PortBinds>,
}

impl Default for InputPipeline {
    fn default() -> Self {
        Self {
            turbo: TurboSettings::default(),
            overlay: OverlaySettings::default(),
            remap_enable: false,
            remap: RemapTable::default(),
            binds: Vec::new(),
        }
    }
}

impl InputPipeline {
    pub fn from_config(config: &InputConfig) -> Result<Self, ConfigError> {
        let binds = config
            .binds
            .iter()
            .take(MAX_PORTS)
            .map(PortBinds::from_names)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            turbo: TurboSettings {
                period: config.turbo_period,
                duty_cycle: config.turbo_duty_cycle,
            },
            overlay: OverlaySettings {
                // The overlay feeds port 0 only.
                analog_dpad_mode: config.analog_dpad_mode.first().copied().unwrap_or_default(),
                axis_threshold: config.axis_threshold,
                opacity: config.overlay_opacity,
            },
            remap_enable: config.remap_binds_enable,
            remap: RemapTable::from_names(&config.remap)?,
            binds,
        })
    }

    pub fn binds(&self, port: u32) -> Option<&PortBinds> {
        self.binds.get(port as usize)
    }

    pub fn turbo_settings(&self) -> &TurboSettings {
        &self.turbo
    }

    pub fn overlay_settings(&self) -> &OverlaySettings {
        &self.overlay
    }

    // ========================================================================
    // Poll
    // ========================================================================

    /// Refresh device state, turbo enables and the overlay aggregate, then
    /// service the command channel.
    pub fn poll(&self, ctx: &mut SessionContext, io: &mut Collaborators) {
        io.input.poll();

        ctx.turbo.advance();
        for port in 0..MAX_PORTS as u32 {
            let held = io
                .input
                .state(self.binds(port), port, DEVICE_JOYPAD, 0, TURBO_ENABLE)
                != 0;
            ctx.turbo.set_frame_enable(port, held);
        }

        if let Some(overlay) = io.overlay.as_deref_mut() {
            let keyboard: Option<&mut dyn KeyboardListener> = match io.keyboard.as_mut() {
                Some(k) => Some(k.as_mut()),
                None => None,
            };
            poll_overlay(
                &mut ctx.overlay,
                overlay,
                io.input.as_mut(),
                keyboard,
                &self.overlay,
            );
        }

        if let Some(command) = io.command.as_deref_mut() {
            command.poll();
        }
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Answer a core query in normal or rewind mode.
    pub fn state(
        &self,
        ctx: &mut SessionContext,
        io: &mut Collaborators,
        port: u32,
        device: u32,
        index: u32,
        id: u32,
    ) -> i16 {
        let query = Query {
            source: BaseSource::Local,
            use_movie: true,
        };
        self.resolve(ctx, io, query, port, device, index, id)
    }

    /// Answer a core query during netplay as host or client.
    ///
    /// The local player's answers are forwarded to the peer.
    pub fn state_netplay(
        &self,
        ctx: &mut SessionContext,
        io: &mut Collaborators,
        port: u32,
        device: u32,
        index: u32,
        id: u32,
    ) -> i16 {
        let Some(local_port) = crate::netplay::local_port(ctx.mode) else {
            return self.state(ctx, io, port, device, index, id);
        };
        let query = Query {
            source: BaseSource::Netplay { local_port },
            use_movie: false,
        };
        let value = self.resolve(ctx, io, query, port, device, index, id);
        if port == local_port
            && let Some(link) = io.netplay.as_deref_mut()
        {
            link.send_input(value);
        }
        value
    }

    /// Answer locally and mirror the answer to spectators.
    pub fn state_spectate_host(
        &self,
        ctx: &mut SessionContext,
        io: &mut Collaborators,
        port: u32,
        device: u32,
        index: u32,
        id: u32,
    ) -> i16 {
        let query = Query {
            source: BaseSource::Local,
            use_movie: false,
        };
        let value = self.resolve(ctx, io, query, port, device, index, id);
        if let Some(link) = io.netplay.as_deref_mut() {
            link.send_input(value);
        }
        value
    }

    /// Replay the spectated host's answers. When the link is cut, notify
    /// the user and continue in normal mode.
    pub fn state_spectate_client(
        &self,
        ctx: &mut SessionContext,
        io: &mut Collaborators,
        port: u32,
        device: u32,
        index: u32,
        id: u32,
    ) -> i16 {
        if let Some(value) = io.netplay.as_deref_mut().and_then(|link| link.recv_input()) {
            return value;
        }

        error!("spectate link lost, falling back to local input");
        ctx.messages.push(SPECTATE_LOST_MESSAGE, 1, 180, false);
        ctx.mode = OperatingMode::Normal;

        let query = Query {
            source: BaseSource::Local,
            use_movie: false,
        };
        self.resolve(ctx, io, query, port, device, index, id)
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve(
        &self,
        ctx: &mut SessionContext,
        io: &mut Collaborators,
        query: Query,
        port: u32,
        device: u32,
        index: u32,
        id: u32,
    ) -> i16 {
        let device = device & DEVICE_MASK;

        // Movie playback short-circuits everything until the tape runs out.
        if query.use_movie
            && !ctx.flags.contains(SessionFlags::MOVIE_END)
            && let Some(movie) = io.movie.as_deref_mut()
            && movie.is_playback()
        {
            match movie.get_input() {
                Some(value) => return value,
                None => {
                    info!("movie playback finished, switching to live input");
                    ctx.set_flag(SessionFlags::MOVIE_END, true);
                }
            }
        }

        let id = if self.remap_enable && id < FIRST_CUSTOM_BIND {
            self.remap.get(port, id)
        } else {
            id
        };

        let mut value = 0i16;
        if !ctx.flags.contains(SessionFlags::BLOCK_INPUT)
            && (id < FIRST_META_KEY || device == DEVICE_KEYBOARD)
        {
            value = self.read_base(io, query.source, port, device, index, id);
        }

        if port == 0
            && !ctx.flags.contains(SessionFlags::BLOCK_INPUT)
            && io.overlay.as_deref().is_some_and(|o| o.is_alive())
        {
            let fused = &ctx.overlay;
            match device {
                DEVICE_JOYPAD if fused.button(id) => value |= 1,
                DEVICE_KEYBOARD if fused.key(id) => value |= 1,
                DEVICE_ANALOG => {
                    let axis = fused.analog[analog_slot(index, id)];
                    if axis != 0 {
                        value = axis;
                    }
                }
                _ => {}
            }
        }

        if ctx.flags.contains(SessionFlags::FLUSHING_INPUT) {
            value = 0;
        }

        if device == DEVICE_JOYPAD && !is_dpad(id) && !ctx.turbo.apply(&self.turbo, port, id, value != 0) {
            value = 0;
        }

        if query.use_movie
            && let Some(movie) = io.movie.as_deref_mut()
            && !movie.is_playback()
        {
            movie.set_input(value);
        }

        value
    }

    fn read_base(
        &self,
        io: &mut Collaborators,
        source: BaseSource,
        port: u32,
        device: u32,
        index: u32,
        id: u32,
    ) -> i16 {
        match source {
            BaseSource::Netplay { local_port } if port != local_port => match io.netplay.as_deref_mut() {
                Some(link) => link.remote_state(port, device, index, id),
                None => 0,
            },
            // The local player always drives the first physical port.
            BaseSource::Netplay { .. } => io.input.state(self.binds(0), 0, device, index, id),
            BaseSource::Local => io.input.state(self.binds(port), port, device, index, id),
        }
    }
}
