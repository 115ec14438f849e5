//! Shared State contract (spec §4.2)
//!
//! "A contract, not a backend": any implementation provides `get`/`put`/
//! `nx_set`/`expire`/`delete`/`incr`/`decr` and an optional `eval_script`
//! equivalent. Single-process implementations are allowed for development;
//! multi-worker deployments require a cross-process backend.

mod in_memory;
mod redis_backed;

pub use in_memory::InMemorySharedState;
pub use redis_backed::RedisSharedState;

use crate::utils::error::Result;
use async_trait::async_trait;

/// Cross-process coordination primitive backing leader election and the
/// least-active selection counters.
#[async_trait]
pub trait SharedState: Send + Sync {
    /// Fetch a value, or `None` if absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Last-writer-wins set
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Set only if absent, with a TTL in seconds. Returns whether the set
    /// took effect — this is the leader-lock acquisition primitive.
    async fn nx_set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool>;

    /// Refresh a key's TTL without changing its value
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Atomically increment a counter, returning the new value
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Atomically decrement a counter, returning the new value. Implementations
    /// clamp at zero rather than going negative.
    async fn decr(&self, key: &str) -> Result<i64>;

    /// Scan `keys`' counters, pick the minimum, increment it, and return
    /// `(winning_index, new_value)`. This is the spec's optional `eval_script`
    /// primitive, specialized to the one script the proxy actually needs:
    /// least-active node selection (spec §4.5).
    async fn select_least_active(&self, keys: &[String]) -> Result<(usize, i64)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn exercise_contract(state: &dyn SharedState) {
        assert_eq!(state.get("missing").await.unwrap(), None);

        assert!(state.nx_set("lock", "owner-a", 30).await.unwrap());
        assert!(!state.nx_set("lock", "owner-b", 30).await.unwrap());
        assert_eq!(state.get("lock").await.unwrap().as_deref(), Some("owner-a"));

        state.delete("lock").await.unwrap();
        assert_eq!(state.get("lock").await.unwrap(), None);

        assert_eq!(state.incr("counter").await.unwrap(), 1);
        assert_eq!(state.incr("counter").await.unwrap(), 2);
        assert_eq!(state.decr("counter").await.unwrap(), 1);
        assert_eq!(state.decr("counter").await.unwrap(), 0);
        assert_eq!(state.decr("counter").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_in_memory_satisfies_contract() {
        let state = InMemorySharedState::new();
        exercise_contract(&state).await;
    }

    #[tokio::test]
    async fn test_in_memory_select_least_active() {
        let state = InMemorySharedState::new();
        let keys = vec!["node:1:active".to_string(), "node:2:active".to_string()];
        state.incr(&keys[0]).await.unwrap();
        state.incr(&keys[0]).await.unwrap();

        let (idx, value) = state.select_least_active(&keys).await.unwrap();
        assert_eq!(idx, 1);
        assert_eq!(value, 1);
    }
}
