//! Redis-backed `SharedState` (spec §4.2, multi-worker deployments)

use super::SharedState;
use crate::storage::redis::RedisPool;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RedisSharedState {
    pool: Arc<RedisPool>,
}

impl RedisSharedState {
    pub fn new(pool: Arc<RedisPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SharedState for RedisSharedState {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.pool.get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.pool.set(key, value).await
    }

    async fn nx_set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool> {
        self.pool.nx_set(key, value, ttl_secs).await
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()> {
        self.pool.expire(key, ttl_secs).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.pool.delete(key).await
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        self.pool.incr(key).await
    }

    async fn decr(&self, key: &str) -> Result<i64> {
        self.pool.decr(key).await
    }

    async fn select_least_active(&self, keys: &[String]) -> Result<(usize, i64)> {
        self.pool.select_least_active(keys).await
    }
}
