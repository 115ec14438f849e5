use sea_orm::DatabaseConnection;

/// SeaORM-based registry store implementation
#[derive(Debug)]
pub struct SeaOrmDatabase {
    pub(super) db: DatabaseConnection,
    pub(super) backend_type: DatabaseBackendType,
}

/// Database backend type indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackendType {
    PostgreSQL,
    SQLite,
}

/// Registry store statistics, surfaced on `/state`
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub total_nodes: u64,
    pub active_nodes: u64,
}
