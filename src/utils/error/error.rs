//! Error handling for the proxy
//!
//! This module defines all error types used throughout the proxy.

#![allow(missing_docs)]

use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Result type alias for the proxy
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Main error type for the proxy
#[derive(Error, Debug)]
#[allow(dead_code)]
pub enum ProxyError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Registry store errors (sea-orm)
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Shared-state backend errors (Redis)
    #[error("Shared state error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Upstream/registry HTTP transport errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML config parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Registry store is unreachable; callers should treat it as transient
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A health or catalog probe against a node failed
    #[error("Probe failure for {addr}: {reason}")]
    ProbeFailure { addr: String, reason: String },

    /// No active node holds the requested model
    #[error("model not available on any node: {0}")]
    ModelUnavailable(String),

    /// No nodes are currently active
    #[error("no healthy nodes available")]
    NoHealthyNodes,

    /// The upstream node failed to answer (connection reset, DNS, etc.)
    #[error("upstream request failed: {0}")]
    UpstreamTransport(String),

    /// The upstream node did not answer within the configured timeout
    #[error("upstream request timed out")]
    UpstreamTimeout,

    /// Client sent a malformed or disallowed request
    #[error("Invalid request: {0}")]
    InvalidClientRequest(String),

    /// This worker is not (or no longer) the scheduler leader
    #[error("leader lock lost or not held")]
    LeaderLost,

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflicting state (e.g. duplicate node address)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Field-level validation failure
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected internal failures
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ResponseError for ProxyError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            ProxyError::InvalidClientRequest(_) | ProxyError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ProxyError::ModelUnavailable(_) | ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::Conflict(_) => StatusCode::CONFLICT,
            ProxyError::UpstreamTransport(_) | ProxyError::UpstreamTimeout => {
                StatusCode::BAD_GATEWAY
            }
            ProxyError::NoHealthyNodes | ProxyError::StoreUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let code = match self {
            ProxyError::Config(_) => "CONFIG_ERROR",
            ProxyError::Database(_) => "DATABASE_ERROR",
            ProxyError::Redis(_) => "SHARED_STATE_ERROR",
            ProxyError::HttpClient(_) => "HTTP_CLIENT_ERROR",
            ProxyError::Serialization(_) | ProxyError::Yaml(_) => "SERIALIZATION_ERROR",
            ProxyError::Io(_) => "IO_ERROR",
            ProxyError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            ProxyError::ProbeFailure { .. } => "PROBE_FAILURE",
            ProxyError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            ProxyError::NoHealthyNodes => "NO_HEALTHY_NODES",
            ProxyError::UpstreamTransport(_) => "UPSTREAM_TRANSPORT_ERROR",
            ProxyError::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            ProxyError::InvalidClientRequest(_) => "INVALID_REQUEST",
            ProxyError::LeaderLost => "LEADER_LOST",
            ProxyError::NotFound(_) => "NOT_FOUND",
            ProxyError::Conflict(_) => "CONFLICT",
            ProxyError::Validation(_) => "VALIDATION_ERROR",
            ProxyError::Internal(_) => "INTERNAL_ERROR",
        };

        // Internal failure detail stays in the logs, not in the client response.
        let message = match self {
            ProxyError::Database(_) => "registry store operation failed".to_string(),
            ProxyError::Redis(_) => "shared state operation failed".to_string(),
            ProxyError::Internal(_) => "an internal error occurred".to_string(),
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                timestamp: chrono::Utc::now().timestamp(),
                request_id: None,
            },
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Standard error response envelope returned to clients
#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(serde::Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub timestamp: i64,
    pub request_id: Option<String>,
}

impl ProxyError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn store_unavailable<S: Into<String>>(message: S) -> Self {
        Self::StoreUnavailable(message.into())
    }

    pub fn probe_failure<S: Into<String>>(addr: S, reason: S) -> Self {
        Self::ProbeFailure {
            addr: addr.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidClientRequest(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = ProxyError::invalid_request("missing model");
        assert!(matches!(error, ProxyError::InvalidClientRequest(_)));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ProxyError::ModelUnavailable("llama2".into()).status_code(),
            actix_web::http::StatusCode::NOT_FOUND
        );
        assert_eq!(
            ProxyError::NoHealthyNodes.status_code(),
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ProxyError::UpstreamTransport("reset".into()).status_code(),
            actix_web::http::StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ProxyError::InvalidClientRequest("node_id not allowed".into()).status_code(),
            actix_web::http::StatusCode::BAD_REQUEST
        );
    }
}
