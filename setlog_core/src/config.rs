//! Configuration file support for setlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/setlog/config.toml`.

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
    pub session: SessionConfig,

    #[serde(default)]
    pub heart_rate: HeartRateConfig,
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

/// Session controller timing and defaults
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "default_heart_rate_interval_ms")]
    pub heart_rate_interval_ms: u64,

    /// Sets created by `add_exercise`
    #[serde(default = "default_set_count")]
    pub default_set_count: u32,

    /// Reps used when neither history nor a template supplies a value
    #[serde(default = "default_reps")]
    pub default_reps: u32,

    /// Grace period requested from the host when suspending
    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            heart_rate_interval_ms: default_heart_rate_interval_ms(),
            default_set_count: default_set_count(),
            default_reps: default_reps(),
            grace_period_secs: default_grace_period_secs(),
        }
    }
}

impl SessionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn heart_rate_interval(&self) -> Duration {
        Duration::from_millis(self.heart_rate_interval_ms.max(1))
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

/// Bounds for the simulated heart rate
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeartRateConfig {
    #[serde(default = "default_min_bpm")]
    pub min_bpm: u32,

    #[serde(default = "default_max_bpm")]
    pub max_bpm: u32,

    #[serde(default = "default_resting_bpm")]
    pub resting_bpm: u32,
}

impl Default for HeartRateConfig {
    fn default() -> Self {
        Self {
            min_bpm: default_min_bpm(),
            max_bpm: default_max_bpm(),
            resting_bpm: default_resting_bpm(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("setlog")
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_heart_rate_interval_ms() -> u64 {
    3000
}

fn default_set_count() -> u32 {
    3
}

fn default_reps() -> u32 {
    10
}

fn default_grace_period_secs() -> u64 {
    30
}

fn default_min_bpm() -> u32 {
    60
}

fn default_max_bpm() -> u32 {
    180
}

fn default_resting_bpm() -> u32 {
    90
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject settings the controller cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.heart_rate.min_bpm > self.heart_rate.max_bpm {
            return Err(Error::Config(format!(
                "heart_rate.min_bpm ({}) exceeds max_bpm ({})",
                self.heart_rate.min_bpm, self.heart_rate.max_bpm
            )));
        }
        if self.session.default_set_count == 0 {
            return Err(Error::Config(
                "session.default_set_count must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("setlog").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
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
