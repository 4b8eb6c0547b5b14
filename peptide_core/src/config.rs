//! Configuration file support.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/peptide/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub reminders: ReminderConfig,
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

/// Notification pass configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Spacing of evaluation points replayed by catch-up, at most 24 so
    /// every calendar day gets one
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u32,

    /// Attempts per wake-up before giving up on a failing pass
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait before attempt N is `N * retry_backoff_secs`
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,

    /// Sends tried per notification, across runs, before it is dropped
    #[serde(default = "default_delivery_attempts")]
    pub delivery_attempts: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            interval_hours: default_interval_hours(),
            max_attempts: default_max_attempts(),
            retry_backoff_secs: default_retry_backoff_secs(),
            delivery_attempts: default_delivery_attempts(),
        }
    }
}

impl ReminderConfig {
    pub fn interval(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.interval_hours))
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("peptide")
}

fn default_interval_hours() -> u32 {
    24
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_secs() -> u64 {
    60
}

fn default_delivery_attempts() -> u32 {
    5
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

    /// Reject settings the scheduler cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(1..=24).contains(&self.reminders.interval_hours) {
            return Err(Error::Config(format!(
                "reminders.interval_hours must be between 1 and 24, got {}",
                self.reminders.interval_hours
            )));
        }
        if self.reminders.max_attempts == 0 {
            return Err(Error::Config(
                "reminders.max_attempts must be at least 1".into(),
            ));
        }
        if self.reminders.delivery_attempts == 0 {
            return Err(Error::Config(
                "reminders.delivery_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("peptide").join("config.toml")
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
