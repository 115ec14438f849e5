use crate::config::DatabaseConfig;
use crate::utils::error::{ProxyError, Result};
use sea_orm::*;
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::super::entities;
use super::super::migration::Migrator;
use super::types::{DatabaseBackendType, SeaOrmDatabase};

impl SeaOrmDatabase {
    /// Create a new registry store connection with automatic SQLite fallback
    /// (spec §3 supplemental persistence detail)
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        match Self::try_connect(&config.url, config).await {
            Ok(db) => {
                let backend_type = if config.url.starts_with("sqlite") {
                    DatabaseBackendType::SQLite
                } else {
                    DatabaseBackendType::PostgreSQL
                };
                info!("registry store connection established ({:?})", backend_type);
                Ok(Self { db, backend_type })
            }
            Err(e) => {
                if config.url.starts_with("postgresql://") || config.url.starts_with("postgres://")
                {
                    warn!("postgres connection failed: {e}, falling back to sqlite");
                    Self::fallback_to_sqlite().await
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn try_connect(url: &str, config: &DatabaseConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url.to_string());
        opt.max_connections(config.max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(config.connection_timeout))
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(3600))
            .sqlx_logging(true)
            .sqlx_logging_level(log::LevelFilter::Debug);

        Database::connect(opt).await.map_err(ProxyError::Database)
    }

    async fn fallback_to_sqlite() -> Result<Self> {
        let data_dir = std::path::Path::new("data");
        if !data_dir.exists() {
            std::fs::create_dir_all(data_dir)
                .map_err(|e| ProxyError::internal(format!("failed to create data directory: {e}")))?;
        }

        let sqlite_path = "sqlite://data/proxy.db?mode=rwc";
        info!("falling back to sqlite: {sqlite_path}");

        let mut opt = ConnectOptions::new(sqlite_path.to_string());
        opt.max_connections(5)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(5))
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(3600))
            .sqlx_logging(true)
            .sqlx_logging_level(log::LevelFilter::Debug);

        let db = Database::connect(opt).await.map_err(ProxyError::Database)?;

        info!("sqlite fallback connection established");
        Ok(Self {
            db,
            backend_type: DatabaseBackendType::SQLite,
        })
    }

    pub fn backend_type(&self) -> DatabaseBackendType {
        self.backend_type
    }

    pub fn is_sqlite_fallback(&self) -> bool {
        self.backend_type == DatabaseBackendType::SQLite
    }

    /// Run registry store migrations
    pub async fn migrate(&self) -> Result<()> {
        info!("running registry store migrations");
        Migrator::up(&self.db, None).await.map_err(|e| {
            warn!("migration failed: {e}");
            ProxyError::Database(e)
        })?;
        info!("registry store migrations completed");
        Ok(())
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn close(self) -> Result<()> {
        self.db.close().await.map_err(ProxyError::Database)?;
        Ok(())
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        debug!("performing registry store health check");
        let _result = entities::Node::find()
            .limit(1)
            .all(&self.db)
            .await
            .map_err(ProxyError::Database)?;
        debug!("registry store health check passed");
        Ok(())
    }
}
