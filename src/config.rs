//! Configuration loading
//!
//! Settings live in a TOML file in the system's standard config directory.
//! Every field is optional; the API key can also come from the environment.

use crate::tvdb::{DEFAULT_BASE_URL, DEFAULT_MAX_PAGES};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides the configured API key
pub const API_KEY_ENV: &str = "TVDB_API_KEY";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine config directory location
    #[error("Failed to determine config directory location")]
    ConfigDirectoryNotFound,

    /// Failed to read the config file
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`Config`]
    #[error("Failed to parse config file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TheTVDB API key; fetching is disabled without one
    pub api_key: Option<String>,
    /// Root URL of TheTVDB v4 API
    pub base_url: String,
    /// Cache database location, defaults to the system cache directory
    pub database_path: Option<PathBuf>,
    /// Most pages fetched for a single series
    pub max_pages: u32,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            database_path: None,
            max_pages: DEFAULT_MAX_PAGES,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Path of the config file in the system's config directory
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let proj_dirs = ProjectDirs::from("org", "tvdb-episodes", "tvdb-episodes")
            .ok_or(ConfigError::ConfigDirectoryNotFound)?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Loads the config file from its default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Loads the config file at `path`, applying environment overrides
    ///
    /// A missing file is not an error and yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
            toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
                path: path.to_path_buf(),
                source: e,
            })?
        } else {
            Self::default()
        };

        config.override_api_key(env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    /// Replaces the API key when `value` holds a non-empty key
    pub fn override_api_key(&mut self, value: Option<String>) {
        if let Some(key) = value.filter(|key| !key.trim().is_empty()) {
            self.api_key = Some(key);
        }
    }

    /// The API key, if one is set and non-empty
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
