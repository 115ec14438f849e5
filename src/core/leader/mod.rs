//! Leader Elector + Scheduler (spec §4.4)
//!
//! Exactly one worker across the fleet holds the lock at a time and owns all
//! writes to the pool, node latencies/models, and the node-id map (spec §3
//! single-writer invariant). Every worker, leader or not, can still read the
//! pool and serve forwarded requests.
//!
//! Grounded on the teacher's background-task pattern in
//! `core/router/health.rs::start_health_check_task` (tokio::spawn +
//! tokio::time::interval), generalized from a single health loop into a
//! lock-guarded scheduler running three independent jobs.

mod reconcile;

pub use reconcile::{health_check_all, model_refresh_all, reconcile_all};

use crate::config::ProxyConfig;
use crate::core::health::Prober;
use crate::core::pool::PoolManager;
use crate::core::registry::Registry;
use crate::core::selector::NodeState;
use crate::core::shared_state::SharedState;
use crate::monitoring::MetricsCollector;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const LEADER_LOCK_KEY: &str = "proxy:leader:lock";
const REFRESH_REQUEST_KEY: &str = "proxy:leader:refresh_request";
const REFRESH_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Runs the leader-election loop and, while holding the lock, the three
/// periodic jobs: liveness probing, model-catalog refresh (which also runs
/// the orphaned-counter consistency job each tick), and heartbeat renewal.
/// Workers that lose the race simply retry on a timer.
pub struct LeaderElector {
    id: String,
    registry: Arc<Registry>,
    pool: Arc<PoolManager>,
    state: Arc<dyn SharedState>,
    prober: Arc<Prober>,
    node_state: Arc<NodeState>,
    metrics: Arc<MetricsCollector>,
    proxy_config: ProxyConfig,
    is_leader: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
}

impl LeaderElector {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        registry: Arc<Registry>,
        pool: Arc<PoolManager>,
        state: Arc<dyn SharedState>,
        prober: Arc<Prober>,
        node_state: Arc<NodeState>,
        metrics: Arc<MetricsCollector>,
        proxy_config: ProxyConfig,
    ) -> Self {
        Self {
            id,
            registry,
            pool,
            state,
            prober,
            node_state,
            metrics,
            proxy_config,
            is_leader: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether this worker currently believes it holds the lock. Read by the
    /// admin `/state` handler to decide between a synchronous reconcile and
    /// publishing a refresh request (spec §4.8).
    pub fn is_leader(&self) -> bool {
        self.is_leader.load(Ordering::Relaxed)
    }

    /// Publish a refresh request for the leader to pick up, for callers that
    /// are not themselves the leader.
    pub async fn request_refresh(&self) -> crate::utils::error::Result<()> {
        self.state.put(REFRESH_REQUEST_KEY, &self.id).await
    }

    /// Spawn the election + scheduler loop as a background task.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Stop the scheduler loop and, if this worker still owns the lock,
    /// delete it so another worker can take over immediately rather than
    /// waiting out the TTL (spec §4.6).
    pub async fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);

        if self.is_leader.load(Ordering::Relaxed) {
            match self.state.get(LEADER_LOCK_KEY).await {
                Ok(Some(owner)) if owner == self.id => {
                    if let Err(err) = self.state.delete(LEADER_LOCK_KEY).await {
                        warn!("leader elector {}: failed to release lock on shutdown: {err}", self.id);
                    } else {
                        info!("leader elector {}: released lock on shutdown", self.id);
                    }
                }
                Ok(_) => {}
                Err(err) => warn!("leader elector {}: owner check failed on shutdown: {err}", self.id),
            }
            self.is_leader.store(false, Ordering::Relaxed);
            self.metrics.set_is_leader(false);
        }
    }

    async fn run(self: Arc<Self>) {
        let ttl = self.proxy_config.leader_lock_ttl_seconds;
        let mut retry = tokio::time::interval(Duration::from_secs(ttl.max(1) / 2));

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                info!("leader elector {}: shutting down", self.id);
                return;
            }

            match self.state.nx_set(LEADER_LOCK_KEY, &self.id, ttl).await {
                Ok(true) => {
                    info!("leader elector {}: acquired leadership", self.id);
                    self.become_leader().await;
                }
                Ok(false) => {
                    self.is_leader.store(false, Ordering::Relaxed);
                    self.metrics.set_is_leader(false);
                }
                Err(err) => {
                    warn!("leader elector {}: lock acquisition failed: {err}", self.id);
                }
            }

            retry.tick().await;
        }
    }

    /// Run the full reconcile once, then the heartbeat and three scheduled
    /// jobs concurrently until the lock is lost or shutdown is requested.
    async fn become_leader(&self) {
        self.is_leader.store(true, Ordering::Relaxed);
        self.metrics.set_is_leader(true);

        if let Err(err) = reconcile::reconcile_all(
            &self.registry,
            &self.pool,
            &self.prober,
            &self.node_state,
            &self.metrics,
            &self.state,
        )
        .await
        {
            warn!("leader elector {}: initial reconcile failed: {err}", self.id);
        }

        let ttl = self.proxy_config.leader_lock_ttl_seconds;
        let mut heartbeat = tokio::time::interval(Duration::from_secs(ttl.max(1) / 2));
        let mut health_tick =
            tokio::time::interval(Duration::from_secs(self.proxy_config.health_check_interval_seconds));
        let mut model_tick = tokio::time::interval(Duration::from_secs(
            self.proxy_config.model_refresh_interval_seconds,
        ));
        let mut refresh_tick = tokio::time::interval(REFRESH_POLL_INTERVAL);

        heartbeat.tick().await;
        health_tick.tick().await;
        model_tick.tick().await;
        refresh_tick.tick().await;

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return;
            }

            tokio::select! {
                _ = heartbeat.tick() => {
                    if !self.renew_lock().await {
                        return;
                    }
                }
                _ = health_tick.tick() => {
                    self.run_health_check().await;
                }
                _ = model_tick.tick() => {
                    self.run_model_refresh().await;
                }
                _ = refresh_tick.tick() => {
                    self.drain_refresh_request().await;
                }
            }
        }
    }

    /// Renew the leader lock's TTL. Returns `false` if the renewal failed,
    /// meaning leadership must be considered lost.
    async fn renew_lock(&self) -> bool {
        match self.state.expire(LEADER_LOCK_KEY, self.proxy_config.leader_lock_ttl_seconds).await {
            Ok(()) => true,
            Err(err) => {
                warn!("leader elector {}: lock renewal failed, stepping down: {err}", self.id);
                self.is_leader.store(false, Ordering::Relaxed);
                self.metrics.set_is_leader(false);
                false
            }
        }
    }

    async fn run_health_check(&self) {
        let addresses = self.pool.all_known_addresses();
        if let Err(err) = reconcile::health_check_all(
            &self.registry,
            &self.pool,
            &self.prober,
            &self.node_state,
            &self.metrics,
            &addresses,
        )
        .await
        {
            warn!("leader elector {}: health check round failed: {err}", self.id);
        }
    }

    /// Runs the catalog scrape and, once per tick, the orphaned-counter
    /// consistency job (spec §9): the pool's id-map is refreshed from the
    /// registry first so a node removed via `DELETE /nodes/{id}` drops out
    /// before counters are diffed against it.
    async fn run_model_refresh(&self) {
        let before = self.pool.all_known_addresses();
        if let Err(err) = self.pool.refresh_from_registry().await {
            warn!("leader elector {}: pool refresh failed: {err}", self.id);
            return;
        }
        let addresses = self.pool.all_known_addresses();
        reconcile::cleanup_orphaned_counters(self.state.as_ref(), &before, &addresses).await;

        if let Err(err) = reconcile::model_refresh_all(
            &self.registry,
            &self.pool,
            &self.prober,
            &self.node_state,
            &self.metrics,
            &addresses,
        )
        .await
        {
            warn!("leader elector {}: model refresh round failed: {err}", self.id);
        }
    }

    /// Pick up an externally-published refresh request and reconcile once,
    /// then clear it. Lets non-leader workers (e.g. a node CRUD handler)
    /// trigger a prompt reconcile without violating the single-writer rule.
    async fn drain_refresh_request(&self) {
        match self.state.get(REFRESH_REQUEST_KEY).await {
            Ok(Some(_)) => {
                info!("leader elector {}: draining refresh request", self.id);
                if let Err(err) = reconcile::reconcile_all(
                    &self.registry,
                    &self.pool,
                    &self.prober,
                    &self.node_state,
                    &self.metrics,
                    &self.state,
                )
                .await
                {
                    warn!("leader elector {}: requested reconcile failed: {err}", self.id);
                }
                let _ = self.state.delete(REFRESH_REQUEST_KEY).await;
            }
            Ok(None) => {}
            Err(err) => warn!("leader elector {}: refresh request poll failed: {err}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared_state::InMemorySharedState;

    #[tokio::test]
    async fn test_nx_set_acquires_lock_exclusively() {
        let state = InMemorySharedState::new();
        assert!(state.nx_set(LEADER_LOCK_KEY, "worker-a", 30).await.unwrap());
        assert!(!state.nx_set(LEADER_LOCK_KEY, "worker-b", 30).await.unwrap());
    }
}
