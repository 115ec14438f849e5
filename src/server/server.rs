//! HTTP server core implementation

use crate::config::{Config, ServerConfig};
use crate::core::HaProxyManager;
use crate::server::middleware::{MetricsMiddleware, RequestIdMiddleware};
use crate::server::routes;
use crate::server::state::AppState;
use crate::utils::error::{ProxyError, Result};
use actix_cors::Cors;
use actix_web::{
    middleware::{DefaultHeaders, Logger},
    web, App, HttpServer as ActixHttpServer,
};
use std::sync::Arc;
use tracing::{info, warn};

/// HTTP server wrapping an actix-web app bound to the configured address
pub struct HttpServer {
    config: ServerConfig,
    state: AppState,
}

impl HttpServer {
    /// Build the HTTP server around an already-initialized proxy manager
    pub async fn new(config: &Config, manager: Arc<HaProxyManager>) -> Result<Self> {
        info!("creating HTTP server");
        let state = AppState::new(manager);

        Ok(Self {
            config: config.server.clone(),
            state,
        })
    }

    /// Assemble the actix-web application: CORS, logging, request-id and
    /// metrics middleware, and the proxy's HTTP surface (spec §6).
    fn create_app(
        state: web::Data<AppState>,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        info!("setting up routes and middleware");

        let cors_config = &state.manager.config().server.cors;
        let mut cors = Cors::default();

        if cors_config.enabled {
            if cors_config.allows_all_origins() {
                cors = cors.allow_any_origin();
                cors_config.validate().unwrap_or_else(|e| {
                    warn!(error = %e, "CORS configuration warning");
                });
            } else {
                for origin in &cors_config.allowed_origins {
                    cors = cors.allowed_origin(origin);
                }
            }

            let methods: Vec<actix_web::http::Method> = cors_config
                .allowed_methods
                .iter()
                .filter_map(|m| m.parse().ok())
                .collect();
            if !methods.is_empty() {
                cors = cors.allowed_methods(methods);
            }

            let headers: Vec<actix_web::http::header::HeaderName> = cors_config
                .allowed_headers
                .iter()
                .filter_map(|h| h.parse().ok())
                .collect();
            if !headers.is_empty() {
                cors = cors.allowed_headers(headers);
            }

            cors = cors.max_age(cors_config.max_age as usize);

            if cors_config.allow_credentials {
                cors = cors.supports_credentials();
            }
        }

        App::new()
            .app_data(state)
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(DefaultHeaders::new().add(("Server", "ollama-ha-proxy")))
            .wrap(MetricsMiddleware)
            .wrap(RequestIdMiddleware)
            .configure(routes::configure)
    }

    /// Start the HTTP server; resolves once the server has stopped. Installs
    /// a SIGTERM/Ctrl-C hook that releases the leader lock before the actix
    /// server itself stops (spec §4.6), rather than leaving it to expire.
    pub async fn start(self) -> Result<()> {
        let bind_addr = self.config.address();
        info!("starting HTTP server on {bind_addr}");

        let manager = self.state.manager.clone();
        let state = web::Data::new(self.state);
        let mut server = ActixHttpServer::new(move || Self::create_app(state.clone()))
            .bind(&bind_addr)
            .map_err(|e| ProxyError::internal(format!("failed to bind {bind_addr}: {e}")))?;

        if let Some(workers) = self.config.worker_count() {
            server = server.workers(workers);
        }

        info!("HTTP server listening on {bind_addr}");

        let server = server.run();
        let handle = server.handle();

        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            info!("shutdown signal received, releasing leader lock");
            manager.shutdown().await;
            handle.stop(true).await;
        });

        server.await.map_err(|e| ProxyError::internal(format!("server error: {e}")))?;

        info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM — whichever arrives first.
async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
