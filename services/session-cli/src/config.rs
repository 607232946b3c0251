//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults.
//! Tokens never live in the TOML; they are kept in the credentials file
//! written by `login` and rotated by the refresh flow.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use session_auth::{DEFAULT_REFRESH_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// API endpoint settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_secs: u64,
}

/// Where the session credential is persisted
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
        }
    }
}

fn default_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_refresh_timeout() -> u64 {
    DEFAULT_REFRESH_TIMEOUT_SECS
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.json")
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(url) = std::env::var("API_URL") {
            config.api.base_url = url;
        }

        common::Error::check_url("base_url", &config.api.base_url)?;
        common::Error::check_nonzero("timeout_secs", config.api.timeout_secs)?;
        common::Error::check_nonzero("refresh_timeout_secs", config.api.refresh_timeout_secs)?;

        Ok(config)
    }

    /// Config file path: the `--config` flag (or `CONFIG_PATH`), else the default.
    pub fn resolve_path(cli_path: Option<PathBuf>) -> PathBuf {
        cli_path.unwrap_or_else(|| PathBuf::from("session-cli.toml"))
    }
}
