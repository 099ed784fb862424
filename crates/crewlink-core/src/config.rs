//! Configuration management for Crewlink
//!
//! Handles loading, saving, and managing client configuration: where the
//! agent-team backend lives and how queries are streamed from it.

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable that overrides `api.base_url`
pub const BASE_URL_ENV: &str = "CREWLINK_BASE_URL";

/// Default values shared by config and client
pub mod defaults {
    pub const BASE_URL: &str = "http://localhost:8000";
    pub const RECURSION_LIMIT: u32 = 150;
    pub const STREAM_TIMEOUT_SECS: u64 = 5 * 60;
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
}

/// Main client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Query streaming settings
    #[serde(default)]
    pub query: QueryConfig,
    /// Where downloaded files go
    #[serde(default)]
    pub downloads: DownloadConfig,
    /// General application settings
    #[serde(default)]
    pub general: GeneralConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the agent-team backend
    pub base_url: String,
    /// Timeout for plain (non-streaming) requests
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BASE_URL.to_string(),
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Recursion limit forwarded to the agent graph
    pub recursion_limit: u32,
    /// Hard deadline for one streamed query, measured from connection start
    pub stream_timeout_secs: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            recursion_limit: defaults::RECURSION_LIMIT,
            stream_timeout_secs: defaults::STREAM_TIMEOUT_SECS,
        }
    }
}

impl QueryConfig {
    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }
}

/// Download configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Target directory (current directory when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl DownloadConfig {
    pub fn target_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Configuration manager for loading and saving config
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::with_path(config_path)
    }

    /// Create a config manager with a specific path
    pub fn with_path(config_path: PathBuf) -> Result<Self> {
        let mut config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            Config::default()
        };
        apply_base_url_override(&mut config, std::env::var(BASE_URL_ENV).ok());

        Ok(Self { config_path, config })
    }

    /// Get the default config path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not find config directory".to_string()))?;

        Ok(config_dir.join("crewlink").join("config.toml"))
    }

    /// Load configuration from a file
    fn load_from_path(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Path the configuration is loaded from and saved to
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&self.config_path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Consume the manager, keeping only the configuration
    pub fn into_config(self) -> Config {
        self.config
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            config_path: PathBuf::from("config.toml"),
            config: Config::default(),
        })
    }
}

fn apply_base_url_override(config: &mut Config, value: Option<String>) {
    if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
        config.api.base_url = url.trim().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.query.recursion_limit, 150);
        assert_eq!(config.query.stream_timeout(), Duration::from_secs(300));
        assert!(config.downloads.dir.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[query]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.api.base_url, config.api.base_url);
        assert_eq!(parsed.query.recursion_limit, config.query.recursion_limit);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: Config = toml::from_str("[query]\nrecursion_limit = 40\n").unwrap();
        assert_eq!(parsed.query.recursion_limit, 40);
        assert_eq!(parsed.query.stream_timeout_secs, defaults::STREAM_TIMEOUT_SECS);
        assert_eq!(parsed.api.base_url, defaults::BASE_URL);
    }

    #[test]
    fn test_base_url_override() {
        let mut config = Config::default();
        apply_base_url_override(&mut config, Some("  ".to_string()));
        assert_eq!(config.api.base_url, defaults::BASE_URL);

        apply_base_url_override(&mut config, Some("http://agents.internal:9000".to_string()));
        assert_eq!(config.api.base_url, "http://agents.internal:9000");
    }
}
