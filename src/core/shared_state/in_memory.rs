//! In-process `SharedState` (spec §4.2: "single-process implementations are
//! allowed for development"). Not safe across multiple OS processes or
//! machines — TTLs are enforced lazily on read, not by a background sweep.

use super::SharedState;
use crate::utils::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

#[derive(Default)]
pub struct InMemorySharedState {
    entries: DashMap<String, Entry>,
}

impl InMemorySharedState {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_live(&self, key: &str) -> Option<String> {
        let expired = self
            .entries
            .get(key)
            .map(|e| e.is_expired())
            .unwrap_or(false);
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|e| e.value.clone())
    }
}

#[async_trait]
impl SharedState for InMemorySharedState {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_live(key))
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn nx_set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool> {
        if self.read_live(key).is_some() {
            return Ok(false);
        }
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_secs)),
            },
        );
        Ok(true)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()> {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + Duration::from_secs(ttl_secs));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: "0".to_string(),
            expires_at: None,
        });
        let current: i64 = entry.value.parse().unwrap_or(0);
        let next = current + 1;
        entry.value = next.to_string();
        Ok(next)
    }

    async fn decr(&self, key: &str) -> Result<i64> {
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: "0".to_string(),
            expires_at: None,
        });
        let current: i64 = entry.value.parse().unwrap_or(0);
        let next = (current - 1).max(0);
        entry.value = next.to_string();
        Ok(next)
    }

    async fn select_least_active(&self, keys: &[String]) -> Result<(usize, i64)> {
        let mut best_idx = 0;
        let mut best_value = i64::MAX;
        for (idx, key) in keys.iter().enumerate() {
            let current: i64 = self
                .read_live(key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            if current < best_value {
                best_value = current;
                best_idx = idx;
            }
        }
        let new_value = self.incr(&keys[best_idx]).await?;
        Ok((best_idx, new_value))
    }
}
