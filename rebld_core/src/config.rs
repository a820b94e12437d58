//! Configuration file support for Rebld.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/rebld/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub timer: TimerConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl DataConfig {
    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("wal").join("workout_logs.wal")
    }

    pub fn csv_path(&self) -> PathBuf {
        self.data_dir.join("workouts.csv")
    }
}

/// Settings the progression controller consults on every logged set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_true")]
    pub auto_start_rest: bool,

    #[serde(default = "default_true")]
    pub rest_sound: bool,

    #[serde(default = "default_true")]
    pub rest_vibration: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            auto_start_rest: true,
            rest_sound: true,
            rest_vibration: true,
        }
    }
}

/// Countdown rendering parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    #[serde(default = "default_add_time_step_s")]
    pub add_time_step_s: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
            add_time_step_s: default_add_time_step_s(),
        }
    }
}

impl TimerConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    base_dir(dirs::data_local_dir(), ".local/share").join("rebld")
}

fn default_true() -> bool {
    true
}

fn default_frame_interval_ms() -> u64 {
    16
}

fn default_add_time_step_s() -> u32 {
    15
}

/// Resolve an XDG base directory, falling back to `$HOME/<fallback>` and then
/// to a relative path when even HOME is missing
fn base_dir(xdg: Option<PathBuf>, fallback: &str) -> PathBuf {
    xdg.unwrap_or_else(|| match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(fallback),
        None => PathBuf::from(fallback),
    })
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        base_dir(dirs::config_dir(), ".config")
            .join("rebld")
            .join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
