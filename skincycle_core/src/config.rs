//! Configuration file support for Skincycle.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/skincycle/config.toml`.

use crate::weather::STALE_AFTER_SECONDS;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub adaptation: AdaptationConfig,
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

/// Weather reading handling
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_stale_after_seconds")]
    pub stale_after_seconds: i64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            stale_after_seconds: default_stale_after_seconds(),
        }
    }
}

/// Context sources the user has switched on
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdaptationConfig {
    #[serde(default = "default_enabled")]
    pub cycle_enabled: bool,

    #[serde(default = "default_enabled")]
    pub weather_enabled: bool,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            cycle_enabled: default_enabled(),
            weather_enabled: default_enabled(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("skincycle")
}

fn default_stale_after_seconds() -> i64 {
    STALE_AFTER_SECONDS
}

fn default_enabled() -> bool {
    true
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

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("skincycle").join("config.toml")
    }

    /// Reject values the planner cannot use
    pub fn validate(&self) -> Result<()> {
        if self.weather.stale_after_seconds <= 0 {
            return Err(Error::Config(format!(
                "weather.stale_after_seconds must be positive, got {}",
                self.weather.stale_after_seconds
            )));
        }
        Ok(())
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
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
