//! Client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const TOKEN_DIR: &str = ".resource-hub";
const TOKEN_FILE: &str = "token";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid value for {var}: {value}")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server origin without a trailing slash, e.g. `http://localhost:8080`.
    pub base_url: String,
    /// File holding the persisted session token.
    pub token_path: PathBuf,
    pub timeouts: Timeouts,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `RESOURCE_HUB_BASE_URL`: default `http://localhost:8080`
    /// - `RESOURCE_HUB_TOKEN_PATH`: default `$HOME/.resource-hub/token`
    /// - `RESOURCE_HUB_REQUEST_TIMEOUT_SECS`: default 30
    /// - `RESOURCE_HUB_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not http(s) or a timeout is not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(env_var("RESOURCE_HUB_BASE_URL").as_deref().unwrap_or(DEFAULT_BASE_URL))?;
        let token_path = match env_var("RESOURCE_HUB_TOKEN_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_token_path(env_var("HOME").as_deref()),
        };
        let timeouts = Timeouts {
            request_secs: env_parse_u64("RESOURCE_HUB_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: env_parse_u64("RESOURCE_HUB_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };
        Ok(Self { base_url, token_path, timeouts })
    }

    /// Replace the base URL, applying the same validation as [`ClientConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not http(s).
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.base_url = normalize_base_url(raw)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_token_path(mut self, path: PathBuf) -> Self {
        self.token_path = path;
        self
    }
}

fn env_var(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_owned()),
        _ => None,
    }
}

fn env_parse_u64(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env_var(key) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { var: key, value: raw }),
        None => Ok(default),
    }
}

pub(crate) fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let Some((scheme, rest)) = trimmed.split_once("://") else {
        return Err(ConfigError::InvalidBaseUrl(raw.to_owned()));
    };
    if !matches!(scheme, "http" | "https") || rest.is_empty() {
        return Err(ConfigError::InvalidBaseUrl(raw.to_owned()));
    }
    Ok(trimmed.to_owned())
}

pub(crate) fn default_token_path(home: Option<&str>) -> PathBuf {
    let root = home.map_or_else(|| PathBuf::from("."), PathBuf::from);
    root.join(TOKEN_DIR).join(TOKEN_FILE)
}
