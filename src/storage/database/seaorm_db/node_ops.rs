//! Registry Store node operations (spec §4.1)

use crate::utils::error::{ProxyError, Result};
use sea_orm::*;
use tracing::debug;

use super::super::entities::{self, node};
use super::types::SeaOrmDatabase;

impl SeaOrmDatabase {
    /// All nodes, regardless of `active`
    pub async fn list_all_nodes(&self) -> Result<Vec<node::Model>> {
        entities::Node::find()
            .all(&self.db)
            .await
            .map_err(ProxyError::Database)
    }

    /// Nodes currently marked active
    pub async fn list_active(&self) -> Result<Vec<node::Model>> {
        entities::Node::find()
            .filter(node::Column::Active.eq(true))
            .all(&self.db)
            .await
            .map_err(ProxyError::Database)
    }

    /// Nodes currently marked inactive
    pub async fn list_inactive(&self) -> Result<Vec<node::Model>> {
        entities::Node::find()
            .filter(node::Column::Active.eq(false))
            .all(&self.db)
            .await
            .map_err(ProxyError::Database)
    }

    pub async fn get_node(&self, id: i32) -> Result<Option<node::Model>> {
        entities::Node::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(ProxyError::Database)
    }

    pub async fn find_node_by_host_port(&self, host: &str, port: i32) -> Result<Option<node::Model>> {
        entities::Node::find()
            .filter(node::Column::Host.eq(host))
            .filter(node::Column::Port.eq(port))
            .one(&self.db)
            .await
            .map_err(ProxyError::Database)
    }

    pub async fn create_node(
        &self,
        name: &str,
        host: &str,
        port: i32,
        active: bool,
    ) -> Result<node::Model> {
        debug!("creating node {name} at {host}:{port}");

        let now = chrono::Utc::now().into();
        let model = node::ActiveModel {
            id: NotSet,
            name: Set(name.to_string()),
            host: Set(host.to_string()),
            port: Set(port),
            active: Set(active),
            available_models: Set("[]".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        model.insert(&self.db).await.map_err(ProxyError::Database)
    }

    pub async fn update_node(
        &self,
        id: i32,
        name: Option<String>,
        host: Option<String>,
        port: Option<i32>,
        active: Option<bool>,
    ) -> Result<node::Model> {
        let existing = self
            .get_node(id)
            .await?
            .ok_or_else(|| ProxyError::not_found(format!("node {id} not found")))?;

        let mut active_model: node::ActiveModel = existing.into();
        if let Some(name) = name {
            active_model.name = Set(name);
        }
        if let Some(host) = host {
            active_model.host = Set(host);
        }
        if let Some(port) = port {
            active_model.port = Set(port);
        }
        if let Some(active) = active {
            active_model.active = Set(active);
        }
        active_model.updated_at = Set(chrono::Utc::now().into());

        active_model.update(&self.db).await.map_err(ProxyError::Database)
    }

    pub async fn delete_node(&self, id: i32) -> Result<()> {
        let result = entities::Node::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(ProxyError::Database)?;

        if result.rows_affected == 0 {
            return Err(ProxyError::not_found(format!("node {id} not found")));
        }
        Ok(())
    }

    /// Coalesce a write: only touches the row when `active` actually transitions
    /// (spec §9 design note on DB writes during reconciliation).
    pub async fn set_active(&self, id: i32, active: bool) -> Result<()> {
        let Some(existing) = self.get_node(id).await? else {
            return Ok(());
        };
        if existing.active == active {
            return Ok(());
        }

        let mut active_model: node::ActiveModel = existing.into();
        active_model.active = Set(active);
        active_model.updated_at = Set(chrono::Utc::now().into());
        active_model.update(&self.db).await.map_err(ProxyError::Database)?;
        Ok(())
    }

    pub async fn set_models(&self, id: i32, models: &[String]) -> Result<()> {
        let Some(existing) = self.get_node(id).await? else {
            return Ok(());
        };

        let serialized = serde_json::to_string(models).map_err(ProxyError::Serialization)?;
        let mut active_model: node::ActiveModel = existing.into();
        active_model.available_models = Set(serialized);
        active_model.updated_at = Set(chrono::Utc::now().into());
        active_model.update(&self.db).await.map_err(ProxyError::Database)?;
        Ok(())
    }
}
