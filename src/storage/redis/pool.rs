//! Redis connection management
//!
//! Thin wrapper around a multiplexed async connection. Higher-level shared-state
//! semantics (get/put/nx_set/incr/decr/eval) live in `core::shared_state`.

use crate::config::RedisConfig;
use crate::utils::error::{ProxyError, Result};
use redis::{Client, aio::MultiplexedConnection};
use tracing::{debug, info};

/// Redis connection pool
#[derive(Debug, Clone)]
pub struct RedisPool {
    pub(crate) client: Client,
    pub(crate) connection_manager: MultiplexedConnection,
}

/// Borrowed connection handle
pub struct RedisConnection {
    pub(crate) conn: MultiplexedConnection,
}

impl RedisPool {
    /// Open a connection pool against the configured Redis URL
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        info!("connecting to redis: {}", Self::sanitize_url(&config.url));

        let client = Client::open(config.url.as_str()).map_err(ProxyError::Redis)?;
        let connection_manager = client
            .get_multiplexed_async_connection()
            .await
            .map_err(ProxyError::Redis)?;

        info!("redis connection established");
        Ok(Self {
            client,
            connection_manager,
        })
    }

    /// Borrow a connection handle
    pub async fn get_connection(&self) -> Result<RedisConnection> {
        Ok(RedisConnection {
            conn: self.connection_manager.clone(),
        })
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        debug!("performing redis health check");
        let mut conn = self.get_connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn.conn)
            .await
            .map_err(ProxyError::Redis)?;
        Ok(())
    }

    /// Hide the password component of a Redis URL for logging
    pub(crate) fn sanitize_url(url: &str) -> String {
        if let Ok(mut parsed) = url::Url::parse(url) {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        } else {
            "invalid_url".to_string()
        }
    }
}
