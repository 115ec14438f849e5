//! # ollama-ha-proxy
//!
//! A highly-available reverse proxy and load balancer for a fleet of
//! Ollama-compatible model-inference backends. Clients send requests for a
//! named model; the proxy selects a healthy backend holding that model,
//! forwards the request (buffered or streamed), and tracks live health,
//! latency, model catalog, and in-flight-request state for every node.
//!
//! ## Components
//!
//! - [`core::registry`] — persisted node records and the single proxy
//!   configuration row.
//! - [`core::shared_state`] — the cross-process coordination contract
//!   backing leader election and request counters.
//! - [`core::health`] — liveness and model-catalog probing.
//! - [`core::pool`] — the in-memory active/standby partitions.
//! - [`core::selector`] — node selection strategies.
//! - [`core::leader`] — the single-leader scheduler running periodic
//!   reconciliation.
//! - [`core::forwarder`] — the per-request forwarding pipeline.
//! - [`core::HaProxyManager`] — orchestrates all of the above.
//!
//! ## Running
//!
//! ```rust,no_run
//! use ollama_ha_proxy::config::Config;
//! use ollama_ha_proxy::server::ServerBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let server = ServerBuilder::new().with_config(config).build().await?;
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod core;
pub mod monitoring;
pub mod server;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use core::HaProxyManager;
pub use utils::error::{ProxyError, Result};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Description of the crate
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build metadata, populated by `build.rs`
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub build_time: &'static str,
    pub git_hash: &'static str,
    pub rust_version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            version: VERSION,
            build_time: option_env!("BUILD_TIME").unwrap_or("unknown"),
            git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
            rust_version: option_env!("RUST_VERSION").unwrap_or("unknown"),
        }
    }
}

pub fn build_info() -> BuildInfo {
    BuildInfo::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info() {
        let info = build_info();
        assert!(!info.version.is_empty());
        assert_eq!(info.version, VERSION);
    }

    #[test]
    fn test_constants() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert_eq!(NAME, env!("CARGO_PKG_NAME"));
        assert_eq!(DESCRIPTION, env!("CARGO_PKG_DESCRIPTION"));
    }
}
