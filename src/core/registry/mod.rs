//! Registry Store (spec §4.1)
//!
//! Persists node records and the single `ProxyConfig` row. Wraps the
//! SeaORM-backed storage layer; change notification is implemented as a
//! broadcast channel since the underlying store has no native pub/sub.

use crate::storage::StorageLayer;
use crate::storage::database::entities::{node, proxy_config};
use crate::utils::error::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Kind of change published on the registry's notification channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// A registry change notification
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub node_id: i32,
    pub kind: ChangeKind,
}

/// Registry Store: `list_active`, `list_inactive`, `get`, `create`, `update`,
/// `delete`, `set_active`, `set_models`, plus an `on_change` channel.
pub struct Registry {
    storage: Arc<StorageLayer>,
    change_tx: broadcast::Sender<ChangeEvent>,
}

impl Registry {
    pub fn new(storage: Arc<StorageLayer>) -> Self {
        let (change_tx, _) = broadcast::channel(256);
        Self { storage, change_tx }
    }

    /// Subscribe to change notifications (spec §4.4: leader reacts to these)
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.change_tx.subscribe()
    }

    fn publish(&self, node_id: i32, kind: ChangeKind) {
        // No subscribers is not an error; the leader may not be running yet.
        let _ = self.change_tx.send(ChangeEvent { node_id, kind });
    }

    pub async fn list_all(&self) -> Result<Vec<node::Model>> {
        self.storage.db().list_all_nodes().await
    }

    pub async fn list_active(&self) -> Result<Vec<node::Model>> {
        self.storage.db().list_active().await
    }

    pub async fn list_inactive(&self) -> Result<Vec<node::Model>> {
        self.storage.db().list_inactive().await
    }

    pub async fn get(&self, id: i32) -> Result<Option<node::Model>> {
        self.storage.db().get_node(id).await
    }

    pub async fn find_by_host_port(&self, host: &str, port: i32) -> Result<Option<node::Model>> {
        self.storage.db().find_node_by_host_port(host, port).await
    }

    pub async fn create(
        &self,
        name: &str,
        host: &str,
        port: i32,
        active: bool,
    ) -> Result<node::Model> {
        let node = self.storage.db().create_node(name, host, port, active).await?;
        debug!("registry: created node {} ({}:{})", node.id, host, port);
        self.publish(node.id, ChangeKind::Created);
        Ok(node)
    }

    pub async fn update(
        &self,
        id: i32,
        name: Option<String>,
        host: Option<String>,
        port: Option<i32>,
        active: Option<bool>,
    ) -> Result<node::Model> {
        let node = self
            .storage
            .db()
            .update_node(id, name, host, port, active)
            .await?;
        self.publish(id, ChangeKind::Updated);
        Ok(node)
    }

    pub async fn delete(&self, id: i32) -> Result<()> {
        self.storage.db().delete_node(id).await?;
        self.publish(id, ChangeKind::Deleted);
        Ok(())
    }

    /// Coalesced write: only persists when `active` transitions (spec §9)
    pub async fn set_active(&self, id: i32, active: bool) -> Result<()> {
        self.storage.db().set_active(id, active).await
    }

    pub async fn set_models(&self, id: i32, models: &[String]) -> Result<()> {
        self.storage.db().set_models(id, models).await
    }

    pub async fn get_config(&self) -> Result<proxy_config::Model> {
        self.storage.db().get_proxy_config().await
    }

    pub async fn update_config(
        &self,
        strategy: Option<String>,
        weight: Option<f64>,
    ) -> Result<proxy_config::Model> {
        self.storage.db().update_proxy_config(strategy, weight).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_event_construction() {
        let event = ChangeEvent {
            node_id: 1,
            kind: ChangeKind::Created,
        };
        assert_eq!(event.node_id, 1);
        assert_eq!(event.kind, ChangeKind::Created);
    }
}
