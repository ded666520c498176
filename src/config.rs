//! Configuration settings for the cadence event engine.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub expansion: ExpansionConfig,
    pub listing: ListingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            expansion: ExpansionConfig::default(),
            listing: ListingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            // Current directory
            PathBuf::from("cadence.toml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("cadence/config.toml"))
                .unwrap_or_default(),
            // Home directory
            dirs::home_dir()
                .map(|p| p.join(".cadence/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.expansion.safety_horizon_days == 0 {
            return Err(
                ConfigError::Invalid("expansion.safety_horizon_days must be > 0".to_string())
                    .into(),
            );
        }

        if self.listing.default_limit == 0 {
            return Err(
                ConfigError::Invalid("listing.default_limit must be > 0".to_string()).into(),
            );
        }

        Ok(())
    }

    /// Expand the data directory path.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let expanded = shellexpand::tilde(&self.storage.data_dir);
        Ok(PathBuf::from(expanded.as_ref()))
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory used by the embedded store when persistence is enabled.
    pub data_dir: String,
    /// Whether the embedded store should persist events to disk.
    pub persist: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.local/share/cadence".to_string(),
            persist: false,
        }
    }
}

/// Occurrence expansion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// Horizon applied when a rule has neither `end_after` nor `end_date`.
    /// Bounds materialization cost; defaults to two years.
    pub safety_horizon_days: u32,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            safety_horizon_days: 730,
        }
    }
}

/// Listing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Result limit applied when a filter does not set one.
    pub default_limit: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self { default_limit: 100 }
    }
}
