//! Configuration management for AVMedia
//!
//! This module handles loading and managing session defaults and timer
//! cadences from config files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::utils::error::{AvMediaError, IntoMediaError, Result};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session defaults and timer cadences
    pub session: SessionConfig,

    /// General application settings
    pub general: GeneralConfig,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Position sampler interval in milliseconds
    pub position_interval_ms: u64,

    /// Display refresh rate driving the frame pump
    pub refresh_rate_hz: u32,

    /// Volume of a freshly created session (0.0 - 1.0)
    pub default_volume: f32,

    /// Playback speed of a freshly created session
    pub default_speed: f32,

    /// Loop flag of a freshly created session
    pub default_looping: bool,
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            position_interval_ms: 10,
            refresh_rate_hz: 60,
            default_volume: 1.0,
            default_speed: 1.0,
            default_looping: false,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl SessionConfig {
    /// Interval between two position samples
    pub fn position_interval(&self) -> Duration {
        Duration::from_millis(self.position_interval_ms)
    }

    /// Interval between two display refresh ticks
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_rate_hz.max(1) as f64)
    }
}

impl Config {
    /// Load configuration from various sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. System config file (/etc/avmedia/config.toml on Linux)
    /// 3. User config file (~/.config/avmedia/config.toml on Linux)
    /// 4. Environment variables (AVMEDIA_* prefix)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(system_path) = Self::system_config_path() {
            if system_path.exists() {
                config = Self::read_file(&system_path)?;
            }
        }

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                config = Self::read_file(&user_path)?;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from an explicit file, then apply environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the given file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .config_err("Failed to create config directory")?;
        }

        let toml = toml::to_string_pretty(self)
            .config_err("Failed to serialize config")?;

        std::fs::write(path, toml)
            .config_err("Failed to write config file")?;

        Ok(())
    }

    fn read_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .config_err("Failed to read config file")?;

        toml::from_str(&contents).config_err("Failed to parse config file")
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(interval) = std::env::var("AVMEDIA_POSITION_INTERVAL_MS") {
            self.session.position_interval_ms = interval.parse()
                .map_err(|_| AvMediaError::Config("Invalid AVMEDIA_POSITION_INTERVAL_MS".to_string()))?;
        }

        if let Ok(rate) = std::env::var("AVMEDIA_REFRESH_RATE_HZ") {
            self.session.refresh_rate_hz = rate.parse()
                .map_err(|_| AvMediaError::Config("Invalid AVMEDIA_REFRESH_RATE_HZ".to_string()))?;
        }

        if let Ok(volume) = std::env::var("AVMEDIA_DEFAULT_VOLUME") {
            self.session.default_volume = volume.parse()
                .map_err(|_| AvMediaError::Config("Invalid AVMEDIA_DEFAULT_VOLUME".to_string()))?;
        }

        if let Ok(log_level) = std::env::var("AVMEDIA_LOG_LEVEL") {
            self.general.log_level = log_level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.session.position_interval_ms == 0 {
            return Err(AvMediaError::Config("Position interval must be non-zero".to_string()));
        }

        if self.session.refresh_rate_hz == 0 {
            return Err(AvMediaError::Config("Refresh rate must be non-zero".to_string()));
        }

        if !(0.0..=1.0).contains(&self.session.default_volume) {
            return Err(AvMediaError::Config("Default volume must be between 0.0 and 1.0".to_string()));
        }

        if !(self.session.default_speed > 0.0) {
            return Err(AvMediaError::Config("Default speed must be positive".to_string()));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.general.log_level.as_str()) {
            return Err(AvMediaError::Config(format!(
                "Invalid log level '{}', must be one of: {:?}",
                self.general.log_level,
                valid_log_levels
            )));
        }

        Ok(())
    }

    /// Get system config file path
    fn system_config_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        return Some(PathBuf::from("/etc/avmedia/config.toml"));

        #[cfg(target_os = "windows")]
        return std::env::var("PROGRAMDATA").ok()
            .map(|p| PathBuf::from(p).join("AVMedia").join("config.toml"));

        #[cfg(target_os = "macos")]
        return Some(PathBuf::from("/Library/Application Support/AVMedia/config.toml"));

        #[allow(unreachable_code)]
        None
    }

    /// Get user config file path
    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("avmedia").join("config.toml"))
    }
}
