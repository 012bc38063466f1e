//! Configuration types for Reel

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::network::DEFAULT_MAX_REDIRECTS;
use crate::storage::RECORDED_WITH;
use crate::{ReelError, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cassette file to replay from, or to record into if it does not exist
    pub cassette_path: PathBuf,
    /// Recording options
    #[serde(default)]
    pub record: RecordConfig,
    /// Resource limits
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Recording options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Store every body as base64 so arbitrary bytes survive a round trip
    #[serde(default)]
    pub preserve_exact_bytes: bool,
    /// Provenance written into saved cassettes
    #[serde(default = "default_recorded_with")]
    pub recorded_with: String,
}

fn default_recorded_with() -> String {
    RECORDED_WITH.to_string()
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            preserve_exact_bytes: false,
            recorded_with: default_recorded_with(),
        }
    }
}

/// Resource limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum recorded response body size in bytes
    #[serde(default = "default_max_response_size")]
    pub max_response_size: usize,
    /// Maximum redirects followed per request
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_max_response_size() -> usize {
    256 * 1024 * 1024 // 256 MB
}

fn default_max_redirects() -> usize {
    DEFAULT_MAX_REDIRECTS
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_response_size: default_max_response_size(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl Config {
    /// Default configuration for a cassette path
    #[must_use]
    pub fn new(cassette_path: impl Into<PathBuf>) -> Self {
        Self {
            cassette_path: cassette_path.into(),
            record: RecordConfig::default(),
            limits: LimitsConfig::default(),
        }
    }

    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReelError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ReelError::ConfigError(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<()> {
        if self.cassette_path.as_os_str().is_empty() {
            return Err(ReelError::ConfigError(
                "cassette_path cannot be empty".to_string(),
            ));
        }

        if let Some(parent) = self.cassette_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(ReelError::ConfigError(format!(
                    "Cassette directory does not exist: {}",
                    parent.display()
                )));
            }
        }

        if self.record.recorded_with.trim().is_empty() {
            return Err(ReelError::ConfigError(
                "recorded_with cannot be empty".to_string(),
            ));
        }

        if self.limits.max_response_size == 0 {
            return Err(ReelError::ConfigError(
                "max_response_size must be > 0".to_string(),
            ));
        }

        if self.limits.max_redirects == 0 {
            return Err(ReelError::ConfigError(
                "max_redirects must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
