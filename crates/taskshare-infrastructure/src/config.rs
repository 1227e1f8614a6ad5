//! Client configuration.
//!
//! Loaded from `config.toml` (see [`TaskSharePaths`]), then overridden by
//! environment variables:
//!
//! | variable             | setting              |
//! |----------------------|----------------------|
//! | `TASKSHARE_BASE_URL` | `server.base_url`    |
//! | `TASKSHARE_PUSH_URL` | `server.push_url`    |
//! | `TASKSHARE_LOG`      | `logging.level`      |

use crate::paths::TaskSharePaths;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use taskshare_core::error::{Result, TaskShareError};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_PUSH_URL: &str = "ws://localhost:5000/ws";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Base URL of the REST API, including the `/api` prefix.
    pub base_url: String,
    /// Push channel endpoint.
    pub push_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            push_url: DEFAULT_PUSH_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Loads the configuration from `path`, or from the default location
    /// when `None`, and applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_from_file(&TaskSharePaths::config_file()?)?,
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Reads a TOML file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file exists but cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(
                "[Config] {} not found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            TaskShareError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            TaskShareError::config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        tracing::debug!("[Config] Loaded {}", path.display());
        Ok(config)
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| TaskShareError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Applies overrides from a key lookup (the process environment in
    /// production). Empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = get("TASKSHARE_BASE_URL") {
            self.server.base_url = url;
        }
        if let Some(url) = get("TASKSHARE_PUSH_URL") {
            self.server.push_url = url;
        }
        if let Some(level) = get("TASKSHARE_LOG") {
            self.logging.level = level;
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if self.server.base_url.trim().is_empty() {
            return Err(TaskShareError::config("server.base_url must not be empty"));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(TaskShareError::config(
                "server.request_timeout_secs must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ClientConfig::load_from_file(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.server.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.server.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nbase_url = \"https://tasks.example.com/api\"\n").unwrap();

        let config = ClientConfig::load_from_file(&path).unwrap();
        assert_eq!(config.server.base_url, "https://tasks.example.com/api");
        assert_eq!(config.server.push_url, DEFAULT_PUSH_URL);
        assert_eq!(config.logging.level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nbase_url = ").unwrap();

        let err = ClientConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, TaskShareError::Config(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nrequest_timeout_secs = 0\n").unwrap();
        assert!(ClientConfig::load_from_file(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TASKSHARE_BASE_URL", "http://10.0.0.2:5000/api"),
            ("TASKSHARE_LOG", "debug"),
            ("TASKSHARE_PUSH_URL", "  "),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.server.base_url, "http://10.0.0.2:5000/api");
        assert_eq!(config.server.push_url, DEFAULT_PUSH_URL);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = ClientConfig::default();
        config.logging.level = "warn".to_string();

        config.save_to_file(&path).unwrap();
        assert_eq!(ClientConfig::load_from_file(&path).unwrap(), config);
    }
}
