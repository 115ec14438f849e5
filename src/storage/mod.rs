//! Storage layer for the proxy
//!
//! Two backends: the Registry Store (SeaORM, spec §4.1) and the Redis
//! connection backing the Shared State contract (spec §4.2).

/// Database storage module — the Registry Store
pub mod database;
/// Redis connection module — backs Shared State
pub mod redis;

use crate::config::StorageConfig;
use crate::utils::error::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Orchestrates the registry store and Redis connection
#[derive(Debug, Clone)]
pub struct StorageLayer {
    /// Registry store connection
    pub database: Arc<database::Database>,
    /// Redis connection backing shared state
    pub redis: Arc<redis::RedisPool>,
}

#[allow(dead_code)]
impl StorageLayer {
    /// Connect to both backends
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        info!("initializing storage layer");

        let database = Arc::new(database::Database::new(&config.database).await?);
        let redis = Arc::new(redis::RedisPool::new(&config.redis).await?);

        info!("storage layer initialized");
        Ok(Self { database, redis })
    }

    /// Run registry store migrations
    pub async fn migrate(&self) -> Result<()> {
        self.database.migrate().await
    }

    /// Health check for both backends
    pub async fn health_check(&self) -> Result<StorageHealthStatus> {
        let mut status = StorageHealthStatus {
            database: false,
            redis: false,
            overall: false,
        };

        match self.database.health_check().await {
            Ok(_) => status.database = true,
            Err(e) => warn!("registry store health check failed: {e}"),
        }

        match self.redis.health_check().await {
            Ok(_) => status.redis = true,
            Err(e) => warn!("redis health check failed: {e}"),
        }

        status.overall = status.database && status.redis;
        Ok(status)
    }

    pub fn db(&self) -> &database::Database {
        &self.database
    }

    pub fn redis(&self) -> &redis::RedisPool {
        &self.redis
    }

    pub async fn redis_conn(&self) -> Result<redis::RedisConnection> {
        self.redis.get_connection().await
    }
}

/// Storage health status
#[derive(Debug, Clone, serde::Serialize)]
pub struct StorageHealthStatus {
    pub database: bool,
    pub redis: bool,
    pub overall: bool,
}
