//! # Drive Configuration
//!
//! All tuning values are fixed at startup and never change while a session runs.
//! The configuration is stored as TOML under `~/.config/gesturedrive/config.toml`;
//! every field falls back to its default, so a partial file is valid.
//!
//! ```toml
//! [steering]
//! deadzone_deg = 2.0
//! max_turn_deg = 50.0
//! smoothing_alpha = 0.2
//! full_lock_threshold = 0.95
//! zero_angle_direction = "left"
//!
//! [pwm]
//! cycle_seconds = 0.1
//!
//! [keys]
//! gas = "w"
//! brake = "s"
//! left = "a"
//! right = "d"
//!
//! [perception]
//! process_every_n_frames = 2
//! frame_interval_ms = 33
//! ```

use crate::keys::{KeyBindings, LogicalKey};
use crate::steering::Direction;
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = ".config/gesturedrive";
const CONFIG_FILE: &str = "config.toml";

/// Errors for configurations the controller refuses to run with
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("max turn angle ({max}) must be greater than deadzone ({deadzone})")]
    TurnRangeEmpty { deadzone: f64, max: f64 },

    #[error("deadzone must be a non-negative finite angle, got {0}")]
    InvalidDeadzone(f64),

    #[error("smoothing alpha must be in (0, 1], got {0}")]
    InvalidAlpha(f64),

    #[error("PWM cycle length must be positive and finite, got {0}s")]
    InvalidCycle(f64),

    #[error("full lock threshold must be in (0, 1], got {0}")]
    InvalidFullLock(f64),

    #[error("process_every_n_frames must be at least 1")]
    InvalidFrameSkip,

    #[error("frame_interval_ms must be at least 1")]
    InvalidFrameInterval,

    #[error("key binding for {0} is empty")]
    EmptyBinding(LogicalKey),

    #[error("key code '{0}' is bound to more than one key")]
    DuplicateBinding(String),
}

/// Steering response tuning
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SteeringSettings {
    /// Angles below this magnitude (degrees) produce no steering
    pub deadzone_deg: f64,
    /// Angle magnitude (degrees) that maps to full lock
    pub max_turn_deg: f64,
    /// EMA weight of a new raw angle
    pub smoothing_alpha: f64,
    /// Intensity at or above which the key is held continuously
    pub full_lock_threshold: f64,
    /// Direction reported for an angle of exactly zero
    pub zero_angle_direction: Direction,
}

impl Default for SteeringSettings {
    fn default() -> Self {
        Self {
            deadzone_deg: 2.0,
            max_turn_deg: 50.0,
            smoothing_alpha: 0.2,
            full_lock_threshold: 0.95,
            zero_angle_direction: Direction::Left,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PwmSettings {
    /// Modulation period in seconds
    pub cycle_seconds: f64,
}

impl Default for PwmSettings {
    fn default() -> Self {
        Self { cycle_seconds: 0.1 }
    }
}

impl PwmSettings {
    pub fn cycle(&self) -> Duration {
        Duration::from_secs_f64(self.cycle_seconds)
    }
}

/// Settings for the perception side of the loop
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PerceptionSettings {
    /// Run hand detection only on every n-th frame and reuse the result in between
    pub process_every_n_frames: u32,
    /// Period of the control loop
    pub frame_interval_ms: u64,
}

impl Default for PerceptionSettings {
    fn default() -> Self {
        Self {
            process_every_n_frames: 2,
            frame_interval_ms: 33,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct DriveConfig {
    pub steering: SteeringSettings,
    pub pwm: PwmSettings,
    pub keys: KeyBindings,
    pub perception: PerceptionSettings,
}

impl DriveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.steering;
        if !s.deadzone_deg.is_finite() || s.deadzone_deg < 0.0 {
            return Err(ConfigError::InvalidDeadzone(s.deadzone_deg));
        }
        if !s.max_turn_deg.is_finite() || s.max_turn_deg <= s.deadzone_deg {
            return Err(ConfigError::TurnRangeEmpty {
                deadzone: s.deadzone_deg,
                max: s.max_turn_deg,
            });
        }
        if !(s.smoothing_alpha > 0.0 && s.smoothing_alpha <= 1.0) {
            return Err(ConfigError::InvalidAlpha(s.smoothing_alpha));
        }
        if !(s.full_lock_threshold > 0.0 && s.full_lock_threshold <= 1.0) {
            return Err(ConfigError::InvalidFullLock(s.full_lock_threshold));
        }

        let cycle = self.pwm.cycle_seconds;
        // Duration::from_secs_f64 panics on huge values, so cap well below u64 seconds
        if !cycle.is_finite() || cycle <= 0.0 || cycle > 3600.0 {
            return Err(ConfigError::InvalidCycle(cycle));
        }

        if self.perception.process_every_n_frames == 0 {
            return Err(ConfigError::InvalidFrameSkip);
        }
        if self.perception.frame_interval_ms == 0 {
            return Err(ConfigError::InvalidFrameInterval);
        }

        let mut seen = HashSet::new();
        for key in LogicalKey::ALL {
            let code = self.keys.code(key).as_str();
            if code.trim().is_empty() {
                return Err(ConfigError::EmptyBinding(key));
            }
            if !seen.insert(code) {
                return Err(ConfigError::DuplicateBinding(code.to_string()));
            }
        }

        debug!("Configuration validated: {:?}", self);
        Ok(())
    }
}

/// Default location of the configuration file
pub fn default_config_path() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    });
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    path
}

/// Writes a default configuration to `path` if no file exists there yet
pub async fn ensure_default_config(path: &Path) -> Result<()> {
    if tokio::fs::try_exists(path)
        .await
        .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
    {
        debug!("Config file present at {}", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
    }

    let content = toml::to_string_pretty(&DriveConfig::default())
        .map_err(|e| eyre!("Failed to serialize default config: {}", e))?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| eyre!("Failed to write default config: {}", e))?;

    info!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// Reads, parses and validates the configuration at `path`
pub async fn load_config(path: &Path) -> Result<DriveConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
    let config: DriveConfig =
        toml::from_str(&content).map_err(|e| eyre!("Failed to parse config file: {}", e))?;

    config
        .validate()
        .map_err(|e| eyre!("Invalid configuration: {}", e))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}
