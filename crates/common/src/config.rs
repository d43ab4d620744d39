//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{LayercutError, LayercutResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Schema file used when no `--schema` argument is given.
    pub default_schema: PathBuf,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "layercut=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_schema: PathBuf::from("layercut.yaml"),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location.
    pub fn load() -> LayercutResult<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path. A missing file yields the
    /// defaults; an unreadable or malformed one is a `Config` error.
    pub fn load_from(config_path: &Path) -> LayercutResult<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(config_path).map_err(|e| {
            LayercutError::config(format!("cannot read {}: {e}", config_path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            LayercutError::config(format!("cannot parse {}: {e}", config_path.display()))
        })
    }

    /// Load config from the standard location, falling back to defaults.
    /// The error that forced the fallback is handed back so the caller can
    /// report it once logging is up.
    pub fn load_or_default() -> (Self, Option<LayercutError>) {
        match Self::load() {
            Ok(config) => (config, None),
            Err(err) => (Self::default(), Some(err)),
        }
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("layercut").join("config.json")
}
