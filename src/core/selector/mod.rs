//! Selector (spec §4.5)
//!
//! Chooses a candidate node address from the active pool, optionally
//! filtered by model name, using one of two strategies.

use crate::core::health::LivenessResult;
use crate::core::pool::PoolManager;
use crate::core::shared_state::SharedState;
use crate::utils::error::{ProxyError, Result};
use dashmap::DashMap;
use std::sync::Arc;

/// Counter key namespace for a node's in-flight request count
pub(crate) fn active_count_key(address: &str) -> String {
    format!("node:active_count:{address}")
}

/// Pick the candidate with the lowest recorded latency, ties broken by
/// first occurrence (spec §4.5 lowest-latency strategy).
fn pick_lowest_latency(candidates: &[String], node_state: &NodeState) -> String {
    let mut best_idx = 0;
    let mut best_latency = f64::INFINITY;
    for (idx, addr) in candidates.iter().enumerate() {
        let latency = node_state.latency(addr);
        if latency < best_latency {
            best_latency = latency;
            best_idx = idx;
        }
    }
    candidates[best_idx].clone()
}

pub use crate::config::Strategy;

/// Per-address liveness/model state the selector reads. The Prober writes
/// these after each probe round; the Selector only reads.
#[derive(Default)]
pub struct NodeState {
    pub latencies: DashMap<String, f64>,
    pub models: DashMap<String, Vec<String>>,
}

impl NodeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_liveness(&self, address: &str, result: LivenessResult) {
        self.latencies.insert(address.to_string(), result.latency_seconds);
    }

    pub fn record_models(&self, address: &str, models: Vec<String>) {
        self.models.insert(address.to_string(), models);
    }

    pub fn latency(&self, address: &str) -> f64 {
        self.latencies
            .get(address)
            .map(|v| *v)
            .unwrap_or(f64::INFINITY)
    }

    pub fn has_model(&self, address: &str, model_name: &str) -> bool {
        self.models
            .get(address)
            .map(|m| m.iter().any(|name| name == model_name))
            .unwrap_or(false)
    }
}

pub struct Selector {
    pool: Arc<PoolManager>,
    state: Arc<SharedStateHandle>,
    node_state: Arc<NodeState>,
}

/// Type alias keeping the trait object boxed once at construction time.
pub type SharedStateHandle = dyn SharedState;

impl Selector {
    pub fn new(
        pool: Arc<PoolManager>,
        state: Arc<dyn SharedState>,
        node_state: Arc<NodeState>,
    ) -> Self {
        Self { pool, state, node_state }
    }

    fn candidates(&self, model_name: Option<&str>) -> Result<Vec<String>> {
        let active = self.pool.active_addresses();
        let candidates: Vec<String> = match model_name {
            Some(name) => active
                .into_iter()
                .filter(|addr| self.node_state.has_model(addr, name))
                .collect(),
            None => active,
        };

        if let Some(name) = model_name {
            if candidates.is_empty() {
                return Err(ProxyError::ModelUnavailable(name.to_string()));
            }
        } else if candidates.is_empty() {
            return Err(ProxyError::NoHealthyNodes);
        }

        Ok(candidates)
    }

    /// Pick a node address for a forwarded request; increments that node's
    /// in-flight counter by exactly one.
    pub async fn acquire(&self, model_name: Option<&str>, strategy: Strategy) -> Result<String> {
        let candidates = self.candidates(model_name)?;

        match strategy {
            Strategy::LowestLatency => {
                let chosen = pick_lowest_latency(&candidates, &self.node_state);
                self.state.incr(&active_count_key(&chosen)).await?;
                Ok(chosen)
            }
            Strategy::LeastActive => {
                let keys: Vec<String> = candidates.iter().map(|a| active_count_key(a)).collect();
                let (idx, _new_value) = self.state.select_least_active(&keys).await?;
                Ok(candidates[idx].clone())
            }
        }
    }

    /// Release a previously-acquired node; decrements its in-flight counter
    /// with an underflow guard.
    pub async fn release(&self, address: &str) -> Result<()> {
        self.state.decr(&active_count_key(address)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_count_key_is_namespaced() {
        let key = active_count_key("http://node-a:11434");
        assert_eq!(key, "node:active_count:http://node-a:11434");
    }

    #[test]
    fn test_node_state_latency_defaults_to_infinity() {
        let state = NodeState::new();
        assert!(state.latency("http://unknown").is_infinite());
    }

    #[test]
    fn test_node_state_has_model() {
        let state = NodeState::new();
        state.record_models("http://node-a:11434", vec!["llama3".to_string()]);
        assert!(state.has_model("http://node-a:11434", "llama3"));
        assert!(!state.has_model("http://node-a:11434", "mistral"));
    }

    #[test]
    fn test_pick_lowest_latency_chooses_the_fastest_node() {
        let node_state = NodeState::new();
        node_state.latencies.insert("http://node-a:11434".to_string(), 0.450);
        node_state.latencies.insert("http://node-b:11434".to_string(), 0.020);
        node_state.latencies.insert("http://node-c:11434".to_string(), 0.200);

        let candidates = vec![
            "http://node-a:11434".to_string(),
            "http://node-b:11434".to_string(),
            "http://node-c:11434".to_string(),
        ];

        assert_eq!(pick_lowest_latency(&candidates, &node_state), "http://node-b:11434");
    }

    #[test]
    fn test_pick_lowest_latency_falls_back_to_first_when_all_unknown() {
        let node_state = NodeState::new();
        let candidates = vec!["http://node-a:11434".to_string(), "http://node-b:11434".to_string()];
        assert_eq!(pick_lowest_latency(&candidates, &node_state), "http://node-a:11434");
    }

    // Spec §8 scenario 3: lowest-latency selection under mocked latency —
    // latencies come from real probe timings against wiremock servers with
    // simulated response delay, not hand-set numbers.
    #[tokio::test]
    async fn test_pick_lowest_latency_under_mocked_probe_latency() {
        use crate::config::ProxyConfig;
        use crate::core::health::Prober;
        use std::time::Duration;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let slow = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(150)))
            .mount(&slow)
            .await;

        let fast = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&fast)
            .await;

        let prober = Prober::new(reqwest::Client::new(), &ProxyConfig::default());
        let node_state = NodeState::new();

        for server in [&slow, &fast] {
            let result = prober.probe_liveness(&server.uri()).await;
            node_state.record_liveness(&server.uri(), result);
        }

        let candidates = vec![slow.uri(), fast.uri()];
        assert_eq!(pick_lowest_latency(&candidates, &node_state), fast.uri());
    }
}
