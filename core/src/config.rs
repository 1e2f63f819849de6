//! Configuration management (config.toml)
//!
//! Settings for every pipeline, loaded from TOML. Missing sections and
//! fields fall back to defaults, so an empty file is a valid config.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::audio::AudioConfig;
use crate::error::ConfigError;
use crate::input::InputConfig;
use crate::video::VideoConfig;
use crate::video::filter::MAX_FILTER_SCALE;

/// Name of the config file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Frontend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub video: VideoConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub rewind: RewindConfig,

    #[serde(default)]
    pub runloop: RunloopConfig,
}

/// Rewind configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewindConfig {
    #[serde(default)]
    pub enable: bool,

    /// Minimum stereo frames of audio one rewind step may capture. The
    /// session raises it to cover one frame of the core's audio.
    #[serde(default = "default_step_budget_frames")]
    pub step_budget_frames: usize,
}

/// Main loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunloopConfig {
    /// How many times slower slow motion runs (>= 1.0).
    #[serde(default = "default_slowmotion_ratio")]
    pub slowmotion_ratio: f64,
}

fn default_step_budget_frames() -> usize {
    // Two 60 Hz frames at 48 kHz.
    1600
}
fn default_slowmotion_ratio() -> f64 {
    3.0
}

impl Default for RewindConfig {
    fn default() -> Self {
        Self {
            enable: false,
            step_budget_frames: default_step_budget_frames(),
        }
    }
}

impl Default for RunloopConfig {
    fn default() -> Self {
        Self {
            slowmotion_ratio: default_slowmotion_ratio(),
        }
    }
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let input = &self.input;
        if input.turbo_period == 0 {
            return Err(invalid("input.turbo_period", "must be greater than 0"));
        }
        if input.turbo_duty_cycle > input.turbo_period {
            return Err(invalid(
                "input.turbo_duty_cycle",
                format!("{} exceeds turbo_period {}", input.turbo_duty_cycle, input.turbo_period),
            ));
        }
        if !(0.0..=1.0).contains(&input.axis_threshold) || input.axis_threshold == 0.0 {
            return Err(invalid(
                "input.axis_threshold",
                format!("{} is outside (0, 1]", input.axis_threshold),
            ));
        }
        if self.audio.output_rate == 0 {
            return Err(invalid("audio.output_rate", "must be greater than 0"));
        }
        if self.video.refresh_rate.is_nan() || self.video.refresh_rate <= 0.0 {
            return Err(invalid("video.refresh_rate", "must be greater than 0"));
        }
        if self.audio.max_timing_skew < 0.0 {
            return Err(invalid("audio.max_timing_skew", "must not be negative"));
        }
        if self.runloop.slowmotion_ratio.is_nan() || self.runloop.slowmotion_ratio < 1.0 {
            return Err(invalid(
                "runloop.slowmotion_ratio",
                format!("{} is below 1.0", self.runloop.slowmotion_ratio),
            ));
        }
        if let Some(filter) = &self.video.filter
            && !(1..=MAX_FILTER_SCALE).contains(&filter.scale)
        {
            return Err(invalid(
                "video.filter.scale",
                format!("{} is outside 1..={}", filter.scale, MAX_FILTER_SCALE),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Linux: `~/.config/retrolink`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "retrolink", "retrolink")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Path of `config.toml` in the platform config directory.
pub fn default_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Load the user's config, or defaults when there is none yet.
///
/// A file that exists but fails to parse or validate is an error.
pub fn load_or_default() -> anyhow::Result<Config> {
    let Some(path) = default_path() else {
        info!("no config directory available, using defaults");
        return Ok(Config::default());
    };
    if !path.exists() {
        info!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    Config::load_from(&path).with_context(|| format!("failed to load {}", path.display()))
}

/// Save the config to the platform config directory.
pub fn save(config: &Config) -> anyhow::Result<()> {
    let path = default_path().context("no config directory available")?;
    config
        .save_to(&path)
        .with_context(|| format!("failed to save {}", path.display()))
}
