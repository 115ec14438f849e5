//! Application state shared across HTTP handlers

use crate::core::HaProxyManager;
use std::sync::Arc;

/// HTTP server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The proxy orchestrator — registry, pools, selector, forwarder, leader
    pub manager: Arc<HaProxyManager>,
}

impl AppState {
    pub fn new(manager: Arc<HaProxyManager>) -> Self {
        Self { manager }
    }
}
