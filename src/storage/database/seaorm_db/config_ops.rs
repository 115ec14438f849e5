//! Registry Store operations on the single `ProxyConfig` row (spec §3, §4.8)

use crate::config::Strategy;
use crate::utils::error::{ProxyError, Result};
use sea_orm::*;
use std::str::FromStr;
use tracing::debug;

use super::super::entities::{self, proxy_config};
use super::types::SeaOrmDatabase;

const PROXY_CONFIG_ID: i32 = 1;

impl SeaOrmDatabase {
    pub async fn get_proxy_config(&self) -> Result<proxy_config::Model> {
        entities::ProxyConfigRow::find_by_id(PROXY_CONFIG_ID)
            .one(&self.db)
            .await
            .map_err(ProxyError::Database)?
            .ok_or_else(|| ProxyError::internal("proxy_config row missing; migrations did not seed it"))
    }

    pub async fn update_proxy_config(
        &self,
        strategy: Option<String>,
        weight: Option<f64>,
    ) -> Result<proxy_config::Model> {
        debug!("updating proxy config: strategy={strategy:?} weight={weight:?}");

        let existing = self.get_proxy_config().await?;
        let mut active_model: proxy_config::ActiveModel = existing.into();

        if let Some(strategy) = strategy {
            Strategy::from_str(&strategy)
                .map_err(|_| ProxyError::validation(format!("unknown strategy '{strategy}'")))?;
            active_model.strategy = Set(strategy);
        }
        if let Some(weight) = weight {
            active_model.weight = Set(weight);
        }
        active_model.updated_at = Set(chrono::Utc::now().into());

        active_model.update(&self.db).await.map_err(ProxyError::Database)
    }
}
