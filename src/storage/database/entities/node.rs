use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Inference node database model (spec §3 `Node`)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "nodes")]
pub struct Model {
    /// Stable integer identifier
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Display name
    pub name: String,

    /// Host, no scheme prefix
    pub host: String,

    /// Port
    pub port: i32,

    /// Cache-derived but persisted so cold starts have a plausible initial partition
    pub active: bool,

    /// Last-observed catalog, JSON array of model-name strings
    #[sea_orm(column_type = "Text")]
    pub available_models: String,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Deterministic address form (spec §3): `http://<host>:<port>`, unless
    /// `host` already carries a scheme or an embedded port.
    pub fn address(&self) -> String {
        if self.host.contains("://") {
            return self.host.clone();
        }
        if self.host.contains(':') {
            return format!("http://{}", self.host);
        }
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn models(&self) -> Vec<String> {
        serde_json::from_str(&self.available_models).unwrap_or_default()
    }
}
