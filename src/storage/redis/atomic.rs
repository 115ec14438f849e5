//! Atomic counter and scripted operations backing the Shared State contract
//! (incr/decr/eval_script — spec §4.2, §4.5).

use super::pool::RedisPool;
use crate::utils::error::{ProxyError, Result};
use redis::AsyncCommands;

impl RedisPool {
    /// Atomic increment
    pub async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.get_connection().await?;
        let new_value: i64 = conn.conn.incr(key, 1).await.map_err(ProxyError::Redis)?;
        Ok(new_value)
    }

    /// Atomic decrement with an underflow guard: never leaves the counter below zero
    pub async fn decr(&self, key: &str) -> Result<i64> {
        let mut conn = self.get_connection().await?;
        let new_value: i64 = conn.conn.decr(key, 1).await.map_err(ProxyError::Redis)?;
        if new_value < 0 {
            let _: () = conn.conn.set(key, 0).await.map_err(ProxyError::Redis)?;
            return Ok(0);
        }
        Ok(new_value)
    }

    /// Server-side least-active selection (spec §4.5 reference algorithm): scans
    /// `keys` for the minimum counter value and atomically increments the winner
    /// in one round trip via a Lua script, so concurrent workers never race on
    /// the read-then-increment step.
    pub async fn select_least_active(&self, keys: &[String]) -> Result<(usize, i64)> {
        const SCRIPT: &str = r#"
            local min_count = nil
            local min_idx = 1
            for i, key in ipairs(KEYS) do
                local c = tonumber(redis.call('GET', key))
                if c == nil then c = 0 end
                if min_count == nil or c < min_count then
                    min_count = c
                    min_idx = i
                end
            end
            local new_value = redis.call('INCR', KEYS[min_idx])
            return {min_idx, new_value}
        "#;

        let mut conn = self.get_connection().await?;
        let mut invocation = redis::cmd("EVAL");
        invocation.arg(SCRIPT).arg(keys.len());
        for key in keys {
            invocation.arg(key);
        }

        let (min_idx, new_value): (i64, i64) = invocation
            .query_async(&mut conn.conn)
            .await
            .map_err(ProxyError::Redis)?;

        Ok(((min_idx - 1) as usize, new_value))
    }
}
