//! Runtime configuration.
//!
//! The only tunable is the API base URL, taken from the
//! `GAMEPLAN_API_BASE` environment variable (a `.env` file is honored
//! by the binary). Everything else about the client - timeouts, the
//! single authorization retry, refresh rotation - is fixed behavior,
//! not configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Environment variable naming the API base URL
const API_BASE_ENV: &str = "GAMEPLAN_API_BASE";

/// Default API base when the environment does not provide one.
/// Matches the development server's default bind address.
const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api";

/// Application name used for the data directory path
const APP_NAME: &str = "gameplan";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a platform data directory")]
    DataDirUnavailable,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
}

impl Config {
    /// Build a config around an explicit base URL. Trailing slashes are
    /// trimmed here once so URL joining never has to think about them.
    pub fn new(api_base: impl Into<String>) -> Self {
        let api_base = api_base.into().trim().trim_end_matches('/').to_string();
        Self { api_base }
    }

    /// Read the base URL from the environment, falling back to the
    /// development default.
    pub fn from_env() -> Self {
        let raw = std::env::var(API_BASE_ENV).unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self::new(raw)
    }

    /// Directory where the credential store lives.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        let data_dir = dirs::data_dir().ok_or(ConfigError::DataDirUnavailable)?;
        Ok(data_dir.join(APP_NAME))
    }
}
