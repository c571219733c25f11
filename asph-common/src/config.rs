//! Configuration loading
//!
//! A single optional TOML file. Resolution follows the usual priority order:
//! 1. Command-line argument (highest priority)
//! 2. `ASPH_CONFIG` environment variable
//! 3. `<config dir>/audiosphere/config.toml`
//! 4. Compiled defaults (fallback)
//!
//! A file named explicitly (1 or 2) must exist and parse. The per-user file (3)
//! is optional; when it is missing the compiled defaults are used.
//!
//! Configuration is read before logging is configured, so values clamped
//! during loading are kept in [`AsphConfig::adjustments`] and reported with
//! [`AsphConfig::log_adjustments`] once a subscriber is installed.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "ASPH_CONFIG";

/// Upper bound for the pause polling interval
pub const MAX_PAUSE_POLL_MS: u64 = 100;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AsphConfig {
    pub logging: LoggingConfig,
    pub playback: PlaybackConfig,
    /// Out-of-range values replaced while loading
    #[serde(skip)]
    pub adjustments: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Playback settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Loop by default when `--loop` is not given
    pub looping: bool,
    /// Output device name (None = default device)
    pub device: Option<String>,
    /// Sleep between checks while paused
    pub pause_poll_ms: u64,
    /// Minimum interval between progress redraws
    pub progress_interval_ms: u64,
    /// Device ring buffer depth
    pub buffer_ms: u32,
    /// Capacity of the transport command queue
    pub command_queue_depth: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            looping: false,
            device: None,
            pause_poll_ms: 50,
            progress_interval_ms: 200,
            buffer_ms: 250,
            command_queue_depth: 32,
        }
    }
}

impl PlaybackConfig {
    pub fn pause_poll(&self) -> Duration {
        Duration::from_millis(self.pause_poll_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

impl AsphConfig {
    /// Parse TOML text and normalise out-of-range values
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config: AsphConfig =
            toml::from_str(text).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.normalize();
        Ok(config)
    }

    /// Load a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve and load configuration following the priority order above
    pub fn resolve(cli_arg: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_arg {
            return Self::load_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.is_empty() {
                return Self::load_file(Path::new(&path));
            }
        }

        if let Some(path) = default_config_path() {
            if path.exists() {
                return Self::load_file(&path);
            }
            debug!("No config file at {}, using defaults", path.display());
        }

        Ok(Self::default())
    }

    /// Warn about every value replaced while loading
    pub fn log_adjustments(&self) {
        for note in &self.adjustments {
            warn!("Configuration: {}", note);
        }
    }

    fn normalize(&mut self) {
        let playback = &mut self.playback;
        let notes = &mut self.adjustments;
        if playback.pause_poll_ms > MAX_PAUSE_POLL_MS {
            notes.push(format!(
                "pause_poll_ms {} exceeds {}ms, clamping",
                playback.pause_poll_ms, MAX_PAUSE_POLL_MS
            ));
            playback.pause_poll_ms = MAX_PAUSE_POLL_MS;
        }
        if playback.pause_poll_ms == 0 {
            notes.push("pause_poll_ms of 0 would busy-spin, using 1ms".to_string());
            playback.pause_poll_ms = 1;
        }
        if playback.command_queue_depth == 0 {
            notes.push("command_queue_depth must be positive, using 1".to_string());
            playback.command_queue_depth = 1;
        }
        if playback.buffer_ms == 0 {
            notes.push("buffer_ms must be positive, using default".to_string());
            playback.buffer_ms = PlaybackConfig::default().buffer_ms;
        }
    }
}

/// Platform location of the per-user config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("audiosphere").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        assert_eq!(AsphConfig::from_toml_str("").unwrap(), AsphConfig::default());
    }

    #[test]
    fn test_partial_section() {
        let config = AsphConfig::from_toml_str(
            r#"
            [playback]
            looping = true
            device = "USB DAC"
            "#,
        )
        .unwrap();
        assert!(config.playback.looping);
        assert_eq!(config.playback.device.as_deref(), Some("USB DAC"));
        assert_eq!(config.playback.pause_poll_ms, 50);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_pause_poll_clamped() {
        let config = AsphConfig::from_toml_str("[playback]\npause_poll_ms = 500\n").unwrap();
        assert_eq!(config.playback.pause_poll(), Duration::from_millis(100));
        let config = AsphConfig::from_toml_str("[playback]\npause_poll_ms = 0\n").unwrap();
        assert_eq!(config.playback.pause_poll_ms, 1);
    }

    #[test]
    fn test_clamped_values_are_recorded_for_later_logging() {
        let config = AsphConfig::from_toml_str(
            "[playback]\npause_poll_ms = 500\ncommand_queue_depth = 0\n",
        )
        .unwrap();
        assert_eq!(config.playback.pause_poll_ms, 100);
        assert_eq!(config.adjustments.len(), 2);
        assert!(config.adjustments[0].contains("pause_poll_ms 500"));
        assert!(config.adjustments[1].contains("command_queue_depth"));

        let clean = AsphConfig::from_toml_str("[playback]\npause_poll_ms = 20\n").unwrap();
        assert!(clean.adjustments.is_empty());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AsphConfig::from_toml_str("[playback\nlooping = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = AsphConfig::from_toml_str("[playback]\nlooping = \"yes\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
