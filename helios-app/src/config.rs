//! Configuration file
//!
//! JSON, camelCase keys, every key optional:
//!
//! ```json
//! { "baseUrl": "http://nas.local:8080", "timeoutSecs": 10, "maxRetries": 2, "pageSize": 48 }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use helios_provider::ClientConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const APP_DIR: &str = "helios";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Catalog server origin.
    pub base_url: String,
    pub timeout_secs: u64,
    /// Retries for transient request failures. `0` sends every request once.
    pub max_retries: u32,
    /// Photographs per page in grids; `-1` shows everything.
    pub page_size: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let client = ClientConfig::default();
        Self {
            base_url: client.base_url,
            timeout_secs: client.timeout.as_secs(),
            max_retries: client.max_retries,
            page_size: -1,
        }
    }
}

impl AppConfig {
    /// `<config dir>/helios/config.json`, or a relative path when the
    /// platform has no config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(CONFIG_FILE)
    }

    /// Read the configuration at `path`. A missing file yields the defaults.
    pub async fn load(path: &Path) -> AppResult<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            log::debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| AppError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if config.base_url.trim().is_empty() {
            return Err(AppError::Config {
                path: path.to_path_buf(),
                message: "baseUrl must not be empty".to_string(),
            });
        }
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Write the configuration to `path`, creating parent directories.
    pub async fn save(&self, path: &Path) -> AppResult<()> {
        let io_error = |e: std::io::Error| AppError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(io_error)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| AppError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        tokio::fs::write(path, content).await.map_err(io_error)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_client() {
        let config = AppConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.page_size, -1);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"maxRetries": 3}"#).unwrap();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn client_config_converts_timeout() {
        let config = AppConfig {
            timeout_secs: 5,
            ..AppConfig::default()
        };
        assert_eq!(config.client_config().timeout, Duration::from_secs(5));
    }

    #[test]
    fn default_path_ends_in_app_dir() {
        let path = AppConfig::default_path();
        assert!(path.ends_with("helios/config.json"));
    }
}
