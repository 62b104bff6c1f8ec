//! Utility module for AVMedia
//!
//! This module provides common utilities used throughout the crate:
//! - Error handling with custom error types
//! - Configuration management
//! - Time conversion helpers shared by the events and the backends

pub mod config;
pub mod error;

// Re-export commonly used items
pub use config::{Config, GeneralConfig, SessionConfig};
pub use error::{AvMediaError, Result};

use std::time::Duration;

/// Initialize the application configuration
///
/// Loads configuration from:
/// 1. Default values
/// 2. System configuration file
/// 3. User configuration file
/// 4. Environment variables
pub fn load_config() -> Result<Config> {
    Config::load()
}

/// Convert a media time to whole milliseconds, truncating like the wire format expects
pub fn to_millis(time: Duration) -> u64 {
    time.as_millis().min(u64::MAX as u128) as u64
}

/// Convert a caller-supplied millisecond value into a media time
///
/// Negative values clamp to zero; non-finite values are rejected.
pub fn from_millis(millis: f64) -> Option<Duration> {
    if !millis.is_finite() {
        return None;
    }
    Duration::try_from_secs_f64(millis.max(0.0) / 1000.0).ok()
}
