//! Basic Redis key/value operations backing the Shared State contract
//! (get/put/nx_set/expire/delete — spec §4.2).

use super::pool::RedisPool;
use crate::utils::error::{ProxyError, Result};
use redis::{AsyncCommands, RedisResult};

impl RedisPool {
    /// Get a value
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.get_connection().await?;
        let result: RedisResult<String> = conn.conn.get(key).await;
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == redis::ErrorKind::TypeError => Ok(None),
            Err(e) => Err(ProxyError::Redis(e)),
        }
    }

    /// Set a key unconditionally (last-writer-wins)
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let _: () = conn.conn.set(key, value).await.map_err(ProxyError::Redis)?;
        Ok(())
    }

    /// Atomic set-if-absent with expiration, used for the leader lock
    pub async fn nx_set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn.conn)
            .await
            .map_err(ProxyError::Redis)?;
        Ok(result.is_some())
    }

    /// Delete a key
    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let _: () = conn.conn.del(key).await.map_err(ProxyError::Redis)?;
        Ok(())
    }

    /// Refresh a key's expiration (leader heartbeat)
    pub async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let _: () = conn
            .conn
            .expire(key, ttl_secs as i64)
            .await
            .map_err(ProxyError::Redis)?;
        Ok(())
    }

    /// Check if a key exists
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let exists: bool = conn.conn.exists(key).await.map_err(ProxyError::Redis)?;
        Ok(exists)
    }
}
