//! Server builder and `run_server` entry point

use crate::config::Config;
use crate::core::HaProxyManager;
use crate::server::server::HttpServer;
use crate::utils::error::{ProxyError, Result};
use std::sync::Arc;
use tracing::info;

/// Builder for easier server configuration
pub struct ServerBuilder {
    config: Option<Config>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self { config: None }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub async fn build(self) -> Result<HttpServer> {
        let config = self
            .config
            .ok_or_else(|| ProxyError::config("configuration is required"))?;

        let manager = Arc::new(HaProxyManager::new(config.clone()).await?);
        manager.spawn_leader();
        HttpServer::new(&config, manager).await
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Load configuration (env-only, by convention `PROXY_CONFIG` names a YAML
/// file) and run the server until it stops.
pub async fn run_server() -> Result<()> {
    info!("starting HA proxy manager");

    let config = match std::env::var("PROXY_CONFIG") {
        Ok(path) => Config::from_file(&path).await.unwrap_or_else(|e| {
            info!("configuration file {path} failed to load ({e}), falling back to env/defaults");
            Config::from_env().unwrap_or_default()
        }),
        Err(_) => Config::from_env().unwrap_or_default(),
    };

    info!("binding to {}", config.server.address());
    info!("endpoints: /generate /chat /embed /embeddings /tags /ps /pull /state /active-requests /config /nodes");

    let manager = Arc::new(HaProxyManager::new(config.clone()).await?);
    manager.spawn_leader();
    let server = HttpServer::new(&config, manager).await?;
    server.start().await
}
