//! Core proxy components (spec §4)
//!
//! [`HaProxyManager`] wires the Registry, Shared State, Prober, Pool
//! Manager, Selector, Leader Elector, and Forwarder together and exposes
//! the methods the HTTP layer calls.

pub mod forwarder;
pub mod health;
pub mod leader;
pub mod pool;
pub mod registry;
pub mod selector;
pub mod shared_state;

use crate::config::Config;
use crate::core::forwarder::{aggregate, Endpoint, Forwarder};
use crate::core::health::Prober;
use crate::core::leader::LeaderElector;
use crate::core::pool::PoolManager;
use crate::core::registry::Registry;
use crate::core::selector::{NodeState, Selector};
use crate::core::shared_state::{InMemorySharedState, RedisSharedState, SharedState};
use crate::monitoring::MetricsCollector;
use crate::storage::database::entities::node;
use crate::storage::StorageLayer;
use crate::utils::error::{ProxyError, Result};
use arc_swap::ArcSwap;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Orchestrates every proxy component for one running worker process.
#[derive(Clone)]
pub struct HaProxyManager {
    config: Arc<Config>,
    storage: Arc<StorageLayer>,
    registry: Arc<Registry>,
    pool: Arc<PoolManager>,
    selector: Arc<Selector>,
    node_state: Arc<NodeState>,
    shared_state: Arc<dyn SharedState>,
    prober: Arc<Prober>,
    forwarder: Arc<Forwarder>,
    leader: Arc<LeaderElector>,
    metrics: Arc<MetricsCollector>,
    strategy_cache: Arc<ArcSwap<crate::config::Strategy>>,
    http_client: reqwest::Client,
}

impl HaProxyManager {
    pub async fn new(config: Config) -> Result<Self> {
        info!("initializing proxy manager");
        let config = Arc::new(config);

        let storage = Arc::new(StorageLayer::new(&config.storage).await?);
        storage.migrate().await?;

        let registry = Arc::new(Registry::new(storage.clone()));
        let pool = Arc::new(PoolManager::new(registry.clone()));
        let node_state = Arc::new(NodeState::new());
        let metrics = Arc::new(MetricsCollector::new());

        let shared_state: Arc<dyn SharedState> = if config.storage.redis.enabled {
            Arc::new(RedisSharedState::new(storage.redis.clone()))
        } else {
            Arc::new(InMemorySharedState::new())
        };

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.proxy.upstream_timeout_seconds))
            .build()
            .map_err(|e| ProxyError::internal(format!("failed to build http client: {e}")))?;

        let probe_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProxyError::internal(format!("failed to build probe client: {e}")))?;
        let prober = Arc::new(Prober::new(probe_client, &config.proxy));

        // No read timeout: a streaming response may legitimately run far
        // longer than any fixed upstream timeout (spec §4.7 step 5).
        let streaming_client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProxyError::internal(format!("failed to build streaming http client: {e}")))?;

        let selector = Arc::new(Selector::new(pool.clone(), shared_state.clone(), node_state.clone()));
        let strategy_cache = Arc::new(ArcSwap::new(Arc::new(config.proxy.strategy)));
        let forwarder = Arc::new(Forwarder::new(
            selector.clone(),
            http_client.clone(),
            streaming_client,
            strategy_cache.clone(),
        ));

        let worker_id = format!("{}-{}", hostname(), std::process::id());
        let leader = Arc::new(LeaderElector::new(
            worker_id,
            registry.clone(),
            pool.clone(),
            shared_state.clone(),
            prober.clone(),
            node_state.clone(),
            metrics.clone(),
            config.proxy.clone(),
        ));

        let manager = Self {
            config,
            storage,
            registry,
            pool,
            selector,
            node_state,
            shared_state,
            prober,
            forwarder,
            leader,
            metrics,
            strategy_cache,
            http_client,
        };

        manager.pool.refresh_from_registry().await?;

        info!("proxy manager initialized");
        Ok(manager)
    }

    /// Spawn the leader-election background loop. Call once at startup.
    pub fn spawn_leader(&self) {
        self.leader.clone().spawn();
    }

    pub async fn shutdown(&self) {
        self.leader.shutdown().await;
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ---- Forwarding ----

    pub async fn generate(&self, req: &actix_web::HttpRequest, body: Value) -> Result<actix_web::HttpResponse> {
        self.forwarder.forward(req, Endpoint::Generate, body).await
    }

    pub async fn chat(&self, req: &actix_web::HttpRequest, body: Value) -> Result<actix_web::HttpResponse> {
        self.forwarder.forward(req, Endpoint::Chat, body).await
    }

    pub async fn embed(&self, req: &actix_web::HttpRequest, body: Value) -> Result<actix_web::HttpResponse> {
        self.forwarder.forward(req, Endpoint::Embed, body).await
    }

    pub async fn embeddings(&self, req: &actix_web::HttpRequest, body: Value) -> Result<actix_web::HttpResponse> {
        self.forwarder.forward(req, Endpoint::Embeddings, body).await
    }

    pub async fn tags(&self) -> Result<Vec<aggregate::TagEntry>> {
        aggregate::tags(&self.http_client, &self.pool).await
    }

    pub async fn ps(&self) -> Result<Vec<aggregate::PsEntry>> {
        aggregate::ps(&self.http_client, &self.pool, &self.registry).await
    }

    pub async fn pull(
        &self,
        model: &str,
        node_id: Option<i32>,
        stream: bool,
        insecure: bool,
    ) -> Result<Vec<aggregate::PullResult>> {
        aggregate::pull(&self.http_client, &self.pool, &self.registry, model, node_id, stream, insecure).await
    }

    // ---- Admin: state & diagnostics ----

    /// `GET /state` (spec §4.8): if the active pool is empty but the
    /// registry has nodes, trigger a synchronous reconcile first — but only
    /// if this worker is the leader, to respect the single-writer invariant.
    /// Otherwise publish a refresh request for the leader to pick up.
    pub async fn get_state(&self) -> Result<StateSnapshot> {
        if self.pool.active_addresses().is_empty() && !self.registry.list_all().await?.is_empty() {
            if self.leader.is_leader() {
                crate::core::leader::reconcile_all(
                    &self.registry,
                    &self.pool,
                    &self.prober,
                    &self.node_state,
                    &self.metrics,
                    &self.shared_state,
                )
                .await?;
            } else {
                self.leader.request_refresh().await?;
            }
        }

        let active = self.pool.active_nodes();
        let standby = self.pool.standby_nodes();
        let node_id_map = self.pool.node_id_map();

        let latencies: HashMap<String, f64> = node_id_map
            .keys()
            .map(|addr| (addr.clone(), self.node_state.latency(addr)))
            .collect();
        let models: HashMap<String, Vec<String>> = node_id_map
            .keys()
            .map(|addr| (addr.clone(), self.node_state.models.get(addr).map(|m| m.clone()).unwrap_or_default()))
            .collect();

        let mut counters = HashMap::new();
        for addr in node_id_map.keys() {
            let key = crate::core::selector::active_count_key(addr);
            if let Ok(Some(value)) = self.shared_state.get(&key).await {
                counters.insert(addr.clone(), value.parse().unwrap_or(0));
            } else {
                counters.insert(addr.clone(), 0);
            }
        }

        Ok(StateSnapshot {
            active: active.into_iter().map(|n| n.address).collect(),
            standby: standby.into_iter().map(|n| n.address).collect(),
            latencies,
            models,
            counters,
            node_id_map,
            is_leader: self.leader.is_leader(),
        })
    }

    /// `GET /active-requests?node_id=` (spec §4.8): join Registry nodes with
    /// shared-state counters, sorted by `active_requests` descending.
    pub async fn get_active_requests(&self, node_id: Option<i32>) -> Result<ActiveRequestsSnapshot> {
        let nodes: Vec<node::Model> = match node_id {
            Some(id) => {
                let node = self
                    .registry
                    .get(id)
                    .await?
                    .ok_or_else(|| ProxyError::not_found(format!("node {id} not found")))?;
                vec![node]
            }
            None => self.registry.list_all().await?,
        };

        let mut entries = Vec::with_capacity(nodes.len());
        let mut total = 0i64;
        for node in nodes {
            let address = node.address();
            let status = if self.pool.is_active(&address) {
                "active"
            } else if self.pool.is_standby(&address) {
                "standby"
            } else {
                "inactive"
            };

            let key = crate::core::selector::active_count_key(&address);
            let active_requests = match self.shared_state.get(&key).await? {
                Some(v) => v.parse().unwrap_or(0),
                None => 0,
            };
            total += active_requests;

            entries.push(ActiveRequestEntry {
                node_id: node.id,
                node_name: node.name,
                node_address: address,
                status: status.to_string(),
                active_requests,
            });
        }

        entries.sort_by(|a, b| b.active_requests.cmp(&a.active_requests));

        Ok(ActiveRequestsSnapshot {
            nodes: entries,
            total_active_requests: total,
        })
    }

    // ---- Admin: config CRUD ----

    pub async fn get_config(&self) -> Result<crate::storage::database::entities::proxy_config::Model> {
        self.registry.get_config().await
    }

    pub async fn update_config(
        &self,
        strategy: Option<String>,
        weight: Option<f64>,
    ) -> Result<crate::storage::database::entities::proxy_config::Model> {
        let updated = self.registry.update_config(strategy, weight).await?;
        let strategy: crate::config::Strategy = updated
            .strategy
            .parse()
            .map_err(|_| ProxyError::internal(format!("persisted strategy '{}' is not valid", updated.strategy)))?;
        self.strategy_cache.store(Arc::new(strategy));
        Ok(updated)
    }

    // ---- Admin: node CRUD ----

    pub async fn list_nodes(&self) -> Result<Vec<node::Model>> {
        self.registry.list_all().await
    }

    pub async fn get_node(&self, id: i32) -> Result<node::Model> {
        self.registry
            .get(id)
            .await?
            .ok_or_else(|| ProxyError::not_found(format!("node {id} not found")))
    }

    /// Create a node; preflight-probes its liveness and uses that result for
    /// `active` unless the caller passed an explicit value (spec §4.8).
    pub async fn create_node(
        &self,
        name: &str,
        host: &str,
        port: i32,
        explicit_active: Option<bool>,
    ) -> Result<node::Model> {
        if self.registry.find_by_host_port(host, port).await?.is_some() {
            return Err(ProxyError::Conflict(format!("node {host}:{port} already exists")));
        }

        let probe_address = node::Model {
            id: 0,
            name: name.to_string(),
            host: host.to_string(),
            port,
            active: false,
            available_models: "[]".to_string(),
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
        }
        .address();

        let active = match explicit_active {
            Some(value) => value,
            None => self.prober.probe_liveness(&probe_address).await.ok,
        };

        let node = self.registry.create(name, host, port, active).await?;
        self.leader.request_refresh().await?;
        debug!("created node {} ({}:{})", node.id, host, port);
        Ok(node)
    }

    /// Update a node; if the address (host/port) changed, preflight-probes
    /// and re-derives `active` unless explicitly supplied (spec §4.8).
    pub async fn update_node(
        &self,
        id: i32,
        name: Option<String>,
        host: Option<String>,
        port: Option<i32>,
        explicit_active: Option<bool>,
    ) -> Result<node::Model> {
        let existing = self.get_node(id).await?;
        let address_changed = host.as_deref().is_some_and(|h| h != existing.host)
            || port.is_some_and(|p| p != existing.port);

        let active = if address_changed && explicit_active.is_none() {
            let new_host = host.clone().unwrap_or_else(|| existing.host.clone());
            let new_port = port.unwrap_or(existing.port);
            let probe_address = node::Model {
                id: existing.id,
                name: existing.name.clone(),
                host: new_host,
                port: new_port,
                active: existing.active,
                available_models: existing.available_models.clone(),
                created_at: existing.created_at,
                updated_at: existing.updated_at,
            }
            .address();
            Some(self.prober.probe_liveness(&probe_address).await.ok)
        } else {
            explicit_active
        };

        let updated = self.registry.update(id, name, host, port, active).await?;
        if address_changed {
            self.leader.request_refresh().await?;
        }
        Ok(updated)
    }

    pub async fn delete_node(&self, id: i32) -> Result<()> {
        self.registry.delete(id).await?;
        self.leader.request_refresh().await
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "worker".to_string())
}

/// `GET /state` response body (spec §4.8)
#[derive(Debug, Serialize)]
pub struct StateSnapshot {
    pub active: Vec<String>,
    pub standby: Vec<String>,
    pub latencies: HashMap<String, f64>,
    pub models: HashMap<String, Vec<String>>,
    pub counters: HashMap<String, i64>,
    pub node_id_map: HashMap<String, i32>,
    pub is_leader: bool,
}

/// One entry of `GET /active-requests` (spec §4.8)
#[derive(Debug, Serialize)]
pub struct ActiveRequestEntry {
    pub node_id: i32,
    pub node_name: String,
    pub node_address: String,
    pub status: String,
    pub active_requests: i64,
}

/// `GET /active-requests` response body (spec §6)
#[derive(Debug, Serialize)]
pub struct ActiveRequestsSnapshot {
    pub nodes: Vec<ActiveRequestEntry>,
    pub total_active_requests: i64,
}
