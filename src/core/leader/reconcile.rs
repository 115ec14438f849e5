//! Probe-and-reconcile helpers shared by the scheduler jobs and the
//! synchronous on-demand refresh triggered by `GET /state` (spec §4.3, §4.8)

use crate::core::health::Prober;
use crate::core::pool::PoolManager;
use crate::core::registry::Registry;
use crate::core::selector::{active_count_key, NodeState};
use crate::core::shared_state::SharedState;
use crate::monitoring::MetricsCollector;
use crate::utils::error::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Liveness probe round: one worker-thread escape per address (spec §4.4),
/// run concurrently, then applied to the pool and registry sequentially.
///
/// Transitions follow the classification policy of spec §4.3: ok moves
/// standby→active and coalesces a registry write only on an actual flip
/// (spec §9 design note); not-ok does the reverse.
pub async fn health_check_all(
    registry: &Registry,
    pool: &PoolManager,
    prober: &Prober,
    node_state: &NodeState,
    metrics: &MetricsCollector,
    addresses: &[String],
) -> Result<()> {
    let probes = futures::future::join_all(addresses.iter().map(|addr| {
        let prober = prober.clone();
        let addr = addr.clone();
        async move {
            let result = prober.probe_liveness(&addr).await;
            (addr, result)
        }
    }))
    .await;

    for (addr, liveness) in probes {
        node_state.record_liveness(&addr, liveness);
        metrics.set_node_latency(&addr, liveness.latency_seconds);

        let Some(id) = pool.node_id_for(&addr) else {
            continue;
        };

        if liveness.ok {
            pool.mark_active(id, &addr);
            registry.set_active(id, true).await?;
        } else {
            pool.mark_standby(id, &addr);
            registry.set_active(id, false).await?;
            metrics.record_probe_failure(&addr, "liveness");
        }
    }

    metrics.set_pool_sizes(pool.active_addresses().len(), pool.standby_addresses().len());
    debug!(
        "health check round complete: {} active, {} standby",
        pool.active_addresses().len(),
        pool.standby_addresses().len()
    );
    Ok(())
}

/// Catalog scrape round (spec §4.3): a node that fails to enumerate its own
/// models is forced to standby immediately, regardless of liveness.
pub async fn model_refresh_all(
    registry: &Registry,
    pool: &PoolManager,
    prober: &Prober,
    node_state: &NodeState,
    metrics: &MetricsCollector,
    addresses: &[String],
) -> Result<()> {
    let probes = futures::future::join_all(addresses.iter().map(|addr| {
        let prober = prober.clone();
        let addr = addr.clone();
        async move {
            let result = prober.probe_catalog(&addr).await;
            (addr, result)
        }
    }))
    .await;

    for (addr, outcome) in probes {
        match outcome {
            Ok(catalog) => {
                node_state.record_models(&addr, catalog.models.clone());
                if let Some(id) = pool.node_id_for(&addr) {
                    registry.set_models(id, &catalog.models).await?;
                }
            }
            Err(_) => {
                metrics.record_probe_failure(&addr, "catalog");
                if let Some(id) = pool.node_id_for(&addr) {
                    pool.mark_standby(id, &addr);
                    registry.set_active(id, false).await?;
                }
            }
        }
    }

    metrics.set_pool_sizes(pool.active_addresses().len(), pool.standby_addresses().len());
    Ok(())
}

/// Consistency job (spec §9): delete the active-count counter for every
/// address that was known before a pool refresh but is absent from the
/// refreshed id-map. A node removed via `DELETE /nodes/{id}` would otherwise
/// leave its counter key in shared state forever, since counters are never
/// destroyed by the acquire/release path itself (spec §3).
pub async fn cleanup_orphaned_counters(state: &dyn SharedState, before: &[String], after: &[String]) {
    let still_known: HashSet<&str> = after.iter().map(String::as_str).collect();
    for addr in before {
        if still_known.contains(addr.as_str()) {
            continue;
        }
        if let Err(err) = state.delete(&active_count_key(addr)).await {
            warn!("reconcile: failed to delete orphaned counter for {addr}: {err}");
        }
    }
}

/// Full reconciliation: reload the pool from the registry, then run a
/// liveness round followed by a catalog round over every known address.
/// Used on leader startup and whenever a refresh is requested.
pub async fn reconcile_all(
    registry: &Arc<Registry>,
    pool: &Arc<PoolManager>,
    prober: &Arc<Prober>,
    node_state: &Arc<NodeState>,
    metrics: &Arc<MetricsCollector>,
    state: &Arc<dyn SharedState>,
) -> Result<()> {
    let before = pool.all_known_addresses();
    pool.refresh_from_registry().await?;
    let addresses = pool.all_known_addresses();
    cleanup_orphaned_counters(state.as_ref(), &before, &addresses).await;
    model_refresh_all(registry, pool, prober, node_state, metrics, &addresses).await?;
    health_check_all(registry, pool, prober, node_state, metrics, &addresses).await?;
    Ok(())
}
