//! Session configuration for the viewer control channel.
//!
//! A [`SessionConfig`] is assembled (or loaded) once, handed to the session
//! at construction, and read-only from then on. Nothing in the core mutates
//! it after launch.

use crate::VIEWER_BINARY;
use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_VERSION: u32 = 1;
const CONFIG_DIR_NAME: &str = "wavescope";

/// Configuration for one viewer control session.
///
/// Write-once-before-launch: construct it, optionally persist it, then hand
/// it to [`ViewerSession::new`](crate::session::ViewerSession::new) by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Path to the viewer executable. Must exist on disk before launch.
    #[serde(default = "default_executable_path")]
    pub executable_path: PathBuf,

    /// Customer specialization tag announced to every new peer.
    /// Empty means no specialization; bootstrap probes status instead.
    #[serde(default)]
    pub specialization: String,

    /// Per-command reply budget in seconds. Must be finite and >= 0.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: f64,

    /// Enables debug-level diagnostics. Observability only, no behavioral
    /// effect on the protocol.
    #[serde(default)]
    pub debug: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            executable_path: default_executable_path(),
            specialization: String::new(),
            read_timeout_secs: default_read_timeout_secs(),
            debug: false,
        }
    }
}

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_executable_path() -> PathBuf {
    PathBuf::from(VIEWER_BINARY)
}
fn default_read_timeout_secs() -> f64 {
    3.0
}

impl SessionConfig {
    /// Load config from {config_dir}/config.json.
    ///
    /// # Returns
    ///
    /// Returns `Ok(SessionConfig)` if loaded successfully, or defaults if the
    /// file is missing.
    /// Returns `Err(ConfigError)` if the file exists but is corrupted/invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: SessionConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/config.json using atomic write.
    ///
    /// Uses temp file + rename for atomicity (no corruption on crash).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - Directory creation fails
    /// - Serialization fails
    /// - Write or rename fails
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        // Atomic rename (POSIX guarantees atomicity)
        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Default config directory: `{platform config dir}/wavescope`.
    ///
    /// Returns `None` when the platform has no config directory at all.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME))
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid version: {} (expected 1-{})",
                    self.version, CONFIG_VERSION
                ),
            });
        }

        if !self.read_timeout_secs.is_finite() || self.read_timeout_secs < 0.0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid read timeout: {} (must be finite and >= 0)",
                    self.read_timeout_secs
                ),
            });
        }

        if self.executable_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "executable_path cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// The per-command reply budget as a [`Duration`].
    ///
    /// Call [`validate`](Self::validate) first; a non-finite or negative
    /// value falls back to zero here rather than panicking.
    pub fn read_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.read_timeout_secs).unwrap_or(Duration::ZERO)
    }
}
