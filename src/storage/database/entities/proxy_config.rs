use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The single mutable `ProxyConfig` row (spec §3) — id is always 1
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "proxy_config")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// `least_active` or `lowest_latency`
    pub strategy: String,

    /// Reserved for future weighted selection tuning
    pub weight: f64,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
