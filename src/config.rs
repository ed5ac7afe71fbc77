//! On-disk API configuration
//!
//! Credentials and fetch parameters live in `config.json` next to the
//! process. The file is rewritten when the access token is refreshed, so the
//! rotated refresh token survives across invocations.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// API configuration loaded from `config.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the API, e.g. `https://api.freeagent.com/v2`
    pub api_base_url: String,
    /// OAuth2 access token sent as a bearer credential
    pub access_token: String,
    /// OAuth2 refresh token used when the access token expires
    pub refresh_token: String,
    /// OAuth2 client id
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// Page size for the catchup sweep
    pub per_page: u32,
    /// Whether to request invoice items nested in each invoice
    pub nested_invoice_items: bool,
}

impl Config {
    /// Load and validate configuration from `path`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when no file exists and
    /// [`ConfigError::Invalid`] on malformed JSON, absent fields, or a
    /// zero `per_page`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing {
                path: path.to_path_buf(),
            });
        }

        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&contents).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if config.per_page == 0 {
            return Err(ConfigError::Invalid(
                "per_page must be greater than zero".to_string(),
            ));
        }
        if config.api_base_url.is_empty() {
            return Err(ConfigError::Invalid(
                "api_base_url cannot be empty".to_string(),
            ));
        }

        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Persist the configuration (including refreshed tokens) back to `path`
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| ConfigError::Io(e.to_string()))?;
        debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

/// Errors related to configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file does not exist
    #[error("configuration file {path} not found; copy config.json.example and add credentials")]
    Missing {
        /// Expected configuration file path
        path: PathBuf,
    },

    /// Configuration file exists but is malformed or incomplete
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),
}
