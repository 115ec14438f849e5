//! Pool Manager (spec §4.4)
//!
//! Holds the in-memory `active`/`standby` partitions and the node-id map.
//! Only the leader writes; all workers may read.

use crate::core::registry::Registry;
use crate::utils::error::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A snapshot of one node's address and database id, as tracked in-memory
/// by the pool.
#[derive(Debug, Clone)]
pub struct PoolNode {
    pub id: i32,
    pub address: String,
}

#[derive(Debug, Default)]
struct PoolState {
    active: Vec<PoolNode>,
    standby: Vec<PoolNode>,
    node_id_map: HashMap<String, i32>,
}

/// Tracks which node addresses are currently serving traffic (`active`) and
/// which are held back (`standby`).
pub struct PoolManager {
    registry: Arc<Registry>,
    state: RwLock<PoolState>,
}

impl PoolManager {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            state: RwLock::new(PoolState::default()),
        }
    }

    /// Reload `active`/`standby`/`node_id_map` from the Registry's
    /// `list_active`/`list_inactive`. Registry I/O happens before the lock
    /// is taken so the write is a quick in-memory swap.
    pub async fn refresh_from_registry(&self) -> Result<()> {
        let active_nodes = self.registry.list_active().await?;
        let standby_nodes = self.registry.list_inactive().await?;

        let mut node_id_map = HashMap::new();
        let active: Vec<PoolNode> = active_nodes
            .iter()
            .map(|n| {
                let addr = n.address();
                node_id_map.insert(addr.clone(), n.id);
                PoolNode { id: n.id, address: addr }
            })
            .collect();
        let standby: Vec<PoolNode> = standby_nodes
            .iter()
            .map(|n| {
                let addr = n.address();
                node_id_map.insert(addr.clone(), n.id);
                PoolNode { id: n.id, address: addr }
            })
            .collect();

        debug!(
            "pool refreshed: {} active, {} standby",
            active.len(),
            standby.len()
        );

        let mut state = self.state.write();
        state.active = active;
        state.standby = standby;
        state.node_id_map = node_id_map;
        Ok(())
    }

    pub fn active_addresses(&self) -> Vec<String> {
        self.state.read().active.iter().map(|n| n.address.clone()).collect()
    }

    pub fn standby_addresses(&self) -> Vec<String> {
        self.state.read().standby.iter().map(|n| n.address.clone()).collect()
    }

    pub fn all_known_addresses(&self) -> Vec<String> {
        let state = self.state.read();
        state
            .active
            .iter()
            .chain(state.standby.iter())
            .map(|n| n.address.clone())
            .collect()
    }

    pub fn node_id_for(&self, address: &str) -> Option<i32> {
        self.state.read().node_id_map.get(address).copied()
    }

    /// Snapshot of the active pool, id and address together (spec §4.8 `/state`)
    pub fn active_nodes(&self) -> Vec<PoolNode> {
        self.state.read().active.clone()
    }

    /// Snapshot of the standby pool, id and address together (spec §4.8 `/state`)
    pub fn standby_nodes(&self) -> Vec<PoolNode> {
        self.state.read().standby.clone()
    }

    /// Snapshot of the id→address map (spec §3 `node_id_map`)
    pub fn node_id_map(&self) -> HashMap<String, i32> {
        self.state.read().node_id_map.clone()
    }

    pub fn is_active(&self, address: &str) -> bool {
        self.state.read().active.iter().any(|n| n.address == address)
    }

    pub fn is_standby(&self, address: &str) -> bool {
        self.state.read().standby.iter().any(|n| n.address == address)
    }

    /// Promote `address` from standby into active, or insert it fresh.
    pub fn mark_active(&self, id: i32, address: &str) {
        let mut state = self.state.write();
        state.mark_active(id, address);
    }

    /// Demote `address` from active into standby, or insert it fresh.
    pub fn mark_standby(&self, id: i32, address: &str) {
        let mut state = self.state.write();
        state.mark_standby(id, address);
    }
}

impl PoolState {
    fn mark_active(&mut self, id: i32, address: &str) {
        self.standby.retain(|n| n.address != address);
        if !self.active.iter().any(|n| n.address == address) {
            self.active.push(PoolNode {
                id,
                address: address.to_string(),
            });
        }
        self.node_id_map.insert(address.to_string(), id);
    }

    fn mark_standby(&mut self, id: i32, address: &str) {
        self.active.retain(|n| n.address != address);
        if !self.standby.iter().any(|n| n.address == address) {
            self.standby.push(PoolNode {
                id,
                address: address.to_string(),
            });
        }
        self.node_id_map.insert(address.to_string(), id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_active_then_standby() {
        let mut state = PoolState::default();
        state.mark_active(1, "http://node-a:11434");
        assert!(state.active.iter().any(|n| n.address == "http://node-a:11434"));
        assert_eq!(state.node_id_map.get("http://node-a:11434"), Some(&1));

        state.mark_standby(1, "http://node-a:11434");
        assert!(!state.active.iter().any(|n| n.address == "http://node-a:11434"));
        assert!(state.standby.iter().any(|n| n.address == "http://node-a:11434"));
    }
}
