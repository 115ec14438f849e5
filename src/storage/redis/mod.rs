//! Redis storage implementation
//!
//! Low-level connection handling and primitive operations. The
//! `SharedState` contract these back is defined in `core::shared_state`.
//!
//! ## Module Structure
//!
//! - `pool` - Connection pool and core connection management
//! - `cache` - get/put/nx_set/expire/delete
//! - `atomic` - incr/decr/select_least_active (scripted)

#![allow(dead_code)]

mod atomic;
mod cache;
mod pool;

pub use pool::{RedisConnection, RedisPool};
