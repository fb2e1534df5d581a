//! Client configuration loading.
//!
//! Reads `~/.config/libris/config.json` when present, then applies
//! environment overrides (`LIBRIS_BASE_URL`, `LIBRIS_TIMEOUT_SECS`).
//! Every field has a default, so a missing file is not an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use libris_core::error::{LibrisError, Result};

const DEFAULT_BASE_URL: &str = "https://booklibrary-iw35.onrender.com/";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the remote lending service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL every endpoint path is resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Loads the configuration from the default file location, falling
    /// back to defaults when the file does not exist, then applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed, or
    /// if an override value does not parse.
    pub fn load() -> Result<Self> {
        let config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.with_overrides(
            std::env::var("LIBRIS_BASE_URL").ok(),
            std::env::var("LIBRIS_TIMEOUT_SECS").ok(),
        )
    }

    /// Loads the configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LibrisError::config(format!(
                "failed to read configuration file at {}: {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            LibrisError::config(format!(
                "failed to parse configuration file at {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// The default configuration file path (~/.config/libris/config.json).
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("libris").join("config.json"))
    }

    /// Applies override values on top of this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout override is not a number.
    fn with_overrides(mut self, base_url: Option<String>, timeout: Option<String>) -> Result<Self> {
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
        if let Some(timeout) = timeout {
            self.timeout_secs = timeout.parse().map_err(|_| {
                LibrisError::config(format!("invalid LIBRIS_TIMEOUT_SECS value: {timeout}"))
            })?;
        }
        Ok(self)
    }

    /// The per-request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_partial_file_is_filled_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"base_url": "http://localhost:8000/"}}"#).unwrap();

        let config = ClientConfig::load_from(&path).unwrap();
        assert_eq!(config.base_url, "http://localhost:8000/");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_invalid_file_is_a_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        let err = ClientConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, LibrisError::Config(_)));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let config = ClientConfig::default()
            .with_overrides(Some("http://example.test/".to_string()), Some("5".to_string()))
            .unwrap();
        assert_eq!(config.base_url, "http://example.test/");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_bad_timeout_override_is_rejected() {
        let err = ClientConfig::default()
            .with_overrides(None, Some("soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, LibrisError::Config(_)));
    }
}
