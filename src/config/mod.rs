//! Configuration management for the proxy
//!
//! Configuration is loaded in layers: a YAML file, then environment
//! variable overrides, then CLI flags for the bind address and config path
//! (spec §6 environment/config supplement).

pub mod models;

pub use models::*;

use crate::utils::error::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Top-level configuration for the proxy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Registry store + shared-state backend configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Monitoring configuration
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// Proxy selection/probing behavior — the `ProxyConfig` row (spec §3)
    #[serde(default)]
    pub proxy: ProxyConfig,
}

#[allow(dead_code)]
impl Config {
    /// Load configuration from a YAML file, applying environment overrides on top
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ProxyError::config(format!("failed to read config file: {e}")))?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ProxyError::config(format!("failed to parse config: {e}")))?;

        let config = config.merge(Self::from_env()?);
        config.validate()?;

        debug!("configuration loaded successfully");
        Ok(config)
    }

    /// Build configuration purely from environment variables and defaults
    /// (spec §6: `PROXY_HOST`/`PROXY_PORT`, `DATABASE_URL`, `REDIS_URL`,
    /// `HEALTH_PATH`, `RUST_LOG`, and the four interval/TTL variables)
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("PROXY_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("PROXY_PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ProxyError::config("PROXY_PORT must be a valid port number"))?;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.storage.database.url = url;
        }
        if let Ok(url) = std::env::var("REDIS_URL") {
            config.storage.redis.url = url;
        }
        if let Ok(path) = std::env::var("HEALTH_PATH") {
            config.proxy.health_path = path;
        }
        if let Ok(v) = std::env::var("HEALTH_CHECK_INTERVAL_SECONDS") {
            config.proxy.health_check_interval_seconds = v
                .parse()
                .map_err(|_| ProxyError::config("HEALTH_CHECK_INTERVAL_SECONDS must be a number"))?;
        }
        if let Ok(v) = std::env::var("MODEL_REFRESH_INTERVAL_SECONDS") {
            config.proxy.model_refresh_interval_seconds = v
                .parse()
                .map_err(|_| ProxyError::config("MODEL_REFRESH_INTERVAL_SECONDS must be a number"))?;
        }
        if let Ok(v) = std::env::var("LEADER_LOCK_TTL_SECONDS") {
            config.proxy.leader_lock_ttl_seconds = v
                .parse()
                .map_err(|_| ProxyError::config("LEADER_LOCK_TTL_SECONDS must be a number"))?;
        }
        if let Ok(v) = std::env::var("UPSTREAM_TIMEOUT_SECONDS") {
            config.proxy.upstream_timeout_seconds = v
                .parse()
                .map_err(|_| ProxyError::config("UPSTREAM_TIMEOUT_SECONDS must be a number"))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("validating configuration");

        self.server
            .validate()
            .map_err(|e| ProxyError::config(format!("server config error: {e}")))?;

        self.server
            .cors
            .validate()
            .map_err(|e| ProxyError::config(format!("CORS config error: {e}")))?;

        self.proxy
            .validate()
            .map_err(|e| ProxyError::config(format!("proxy config error: {e}")))?;

        Ok(())
    }

    /// Merge with another configuration (other takes precedence)
    pub fn merge(mut self, other: Self) -> Self {
        self.server = self.server.merge(other.server);
        self.storage = self.storage.merge(other.storage);
        self.monitoring = self.monitoring.merge(other.monitoring);
        self.proxy = self.proxy.merge(other.proxy);
        self
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ProxyError::config(format!("failed to serialize config to JSON: {e}")))
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ProxyError::config(format!("failed to serialize config to YAML: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_config_from_file() {
        let config_content = r#"
server:
  host: "127.0.0.1"
  port: 8080

storage:
  database:
    url: "sqlite://test.db?mode=rwc"
  redis:
    url: "redis://localhost:6379"

proxy:
  strategy: "lowest_latency"
  weight: 1.0
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(config_content.as_bytes()).unwrap();

        let config = Config::from_file(temp_file.path()).await.unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.proxy.strategy, Strategy::LowestLatency);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.proxy.strategy, Strategy::LeastActive);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();

        let json = config.to_json().unwrap();
        assert!(!json.is_empty());

        let yaml = config.to_yaml().unwrap();
        assert!(!yaml.is_empty());
    }
}
