//! ollama-ha-proxy - Highly-available reverse proxy for Ollama-compatible backends

#![allow(missing_docs)]

use ollama_ha_proxy::server;
use ollama_ha_proxy::utils::logging;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_logging();

    match server::run_server().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
