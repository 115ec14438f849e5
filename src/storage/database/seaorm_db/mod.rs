mod config_ops;
mod connection;
mod node_ops;
mod types;

pub use types::{DatabaseBackendType, DatabaseStats, SeaOrmDatabase};
