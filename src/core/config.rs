//! Operator configuration
//!
//! Read-only: the crate never writes the file. Missing file or missing
//! fields fall back to the platform defaults, so embedders work with no
//! configuration at all.

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HUB_BASE_URL: &str = "https://huggingface.co";
pub const DEFAULT_ROUTER_BASE_URL: &str = "https://router.huggingface.co";
pub const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 90;

/// Errors that can occur when loading configuration from disk.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as valid TOML.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "Failed to parse config at {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the hub carrying the identity and model-listing
    /// endpoints.
    #[serde(default = "default_hub_base_url")]
    pub hub_base_url: String,

    /// Base URL of the inference router carrying the chat completions
    /// endpoint.
    #[serde(default = "default_router_base_url")]
    pub router_base_url: String,

    /// Seconds without a stream chunk before the turn is failed.
    #[serde(default = "default_stream_idle_timeout_secs")]
    pub stream_idle_timeout_secs: u64,
}

fn default_hub_base_url() -> String {
    DEFAULT_HUB_BASE_URL.to_string()
}

fn default_router_base_url() -> String {
    DEFAULT_ROUTER_BASE_URL.to_string()
}

fn default_stream_idle_timeout_secs() -> u64 {
    DEFAULT_STREAM_IDLE_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hub_base_url: default_hub_base_url(),
            router_base_url: default_router_base_url(),
            stream_idle_timeout_secs: default_stream_idle_timeout_secs(),
        }
    }
}

impl Config {
    /// Load the config from the platform config directory, defaults when
    /// the file or the directory lookup is unavailable.
    pub fn load() -> Result<Config, ConfigError> {
        match Self::config_path() {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Config, ConfigError> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
                path: config_path.to_path_buf(),
                source,
            })?;
            let config: Config =
                toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: config_path.to_path_buf(),
                    source,
                })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "hugtry", "hugtry")
            .map(|proj_dirs| proj_dirs.config_dir().join("config.toml"))
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs)
    }
}
