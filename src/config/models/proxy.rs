//! Proxy behavior configuration — the single `ProxyConfig` row (spec §3)

use super::*;
use serde::{Deserialize, Serialize};

/// Selection strategy used by the Selector component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Pick the active address with the fewest in-flight requests
    LeastActive,
    /// Pick the active address with the lowest observed latency
    LowestLatency,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::LeastActive
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::LeastActive => write!(f, "least_active"),
            Strategy::LowestLatency => write!(f, "lowest_latency"),
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "least_active" => Ok(Strategy::LeastActive),
            "lowest_latency" => Ok(Strategy::LowestLatency),
            other => Err(format!("unknown strategy: {other}")),
        }
    }
}

/// The single mutable row governing selection behavior (spec §3, §6 `/config`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Default selection strategy when a request does not name one
    #[serde(default)]
    pub strategy: Strategy,
    /// Reserved for future weighted selection tuning
    #[serde(default = "default_weight")]
    pub weight: f32,
    /// Path appended to a node's address for liveness probes (spec §9 open question)
    #[serde(default)]
    pub health_path: String,
    /// Seconds between liveness probe rounds
    #[serde(default = "default_health_check_interval_seconds")]
    pub health_check_interval_seconds: u64,
    /// Seconds between model-catalog refresh rounds
    #[serde(default = "default_model_refresh_interval_seconds")]
    pub model_refresh_interval_seconds: u64,
    /// TTL on the leader lock held in shared state
    #[serde(default = "default_leader_lock_ttl_seconds")]
    pub leader_lock_ttl_seconds: u64,
    /// Per-request timeout when forwarding to an upstream node
    #[serde(default = "default_upstream_timeout_seconds")]
    pub upstream_timeout_seconds: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            weight: default_weight(),
            health_path: String::new(),
            health_check_interval_seconds: default_health_check_interval_seconds(),
            model_refresh_interval_seconds: default_model_refresh_interval_seconds(),
            leader_lock_ttl_seconds: default_leader_lock_ttl_seconds(),
            upstream_timeout_seconds: default_upstream_timeout_seconds(),
        }
    }
}

#[allow(dead_code)]
impl ProxyConfig {
    /// Merge with another configuration (other takes precedence on non-default fields)
    pub fn merge(mut self, other: Self) -> Self {
        if other.strategy != Strategy::default() {
            self.strategy = other.strategy;
        }
        if other.weight != default_weight() {
            self.weight = other.weight;
        }
        if !other.health_path.is_empty() {
            self.health_path = other.health_path;
        }
        if other.health_check_interval_seconds != default_health_check_interval_seconds() {
            self.health_check_interval_seconds = other.health_check_interval_seconds;
        }
        if other.model_refresh_interval_seconds != default_model_refresh_interval_seconds() {
            self.model_refresh_interval_seconds = other.model_refresh_interval_seconds;
        }
        if other.leader_lock_ttl_seconds != default_leader_lock_ttl_seconds() {
            self.leader_lock_ttl_seconds = other.leader_lock_ttl_seconds;
        }
        if other.upstream_timeout_seconds != default_upstream_timeout_seconds() {
            self.upstream_timeout_seconds = other.upstream_timeout_seconds;
        }
        self
    }

    /// Validate field ranges
    pub fn validate(&self) -> Result<(), String> {
        if self.weight <= 0.0 {
            return Err("weight must be positive".to_string());
        }
        if self.health_check_interval_seconds == 0 {
            return Err("health_check_interval_seconds cannot be 0".to_string());
        }
        if self.model_refresh_interval_seconds == 0 {
            return Err("model_refresh_interval_seconds cannot be 0".to_string());
        }
        if self.leader_lock_ttl_seconds == 0 {
            return Err("leader_lock_ttl_seconds cannot be 0".to_string());
        }
        if self.upstream_timeout_seconds == 0 {
            return Err("upstream_timeout_seconds cannot be 0".to_string());
        }
        Ok(())
    }
}

pub fn default_health_check_interval_seconds() -> u64 {
    10
}

pub fn default_model_refresh_interval_seconds() -> u64 {
    60
}

pub fn default_leader_lock_ttl_seconds() -> u64 {
    30
}

pub fn default_upstream_timeout_seconds() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_round_trip() {
        assert_eq!("least_active".parse::<Strategy>().unwrap(), Strategy::LeastActive);
        assert_eq!("lowest_latency".parse::<Strategy>().unwrap(), Strategy::LowestLatency);
        assert!("round_robin".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_default_config_validates() {
        assert!(ProxyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_intervals() {
        let mut cfg = ProxyConfig::default();
        cfg.health_check_interval_seconds = 0;
        assert!(cfg.validate().is_err());
    }
}
