//! HTTP route handlers, organized by the proxy's functional surface (spec §6)

pub mod admin;
pub mod aggregate;
pub mod config;
pub mod forward;
pub mod nodes;

use actix_web::web;

/// Wire every route group onto the application
pub fn configure(cfg: &mut web::ServiceConfig) {
    forward::configure(cfg);
    aggregate::configure(cfg);
    admin::configure(cfg);
    config::configure(cfg);
    nodes::configure(cfg);
}
