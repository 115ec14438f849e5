//! HTTP server: routing, middleware, and application state

pub mod middleware;
pub mod routes;

mod builder;
mod server;
mod state;

pub use builder::{run_server, ServerBuilder};
pub use server::HttpServer;
pub use state::AppState;
