//! Forwarder (spec §4.7)
//!
//! Per-request pipeline: parse, select, acquire, dispatch upstream
//! (buffered or streaming), release exactly once on every exit path.
//!
//! Grounded on the teacher's `core/streaming/{mod.rs,providers.rs}`
//! (`HttpResponse::streaming` fed by a `reqwest` byte stream), generalized
//! from re-parsed SSE frames to a raw ndjson/json passthrough.

pub mod aggregate;

use crate::config::Strategy;
use crate::core::selector::Selector;
use crate::utils::error::{ProxyError, Result};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::web::Bytes;
use actix_web::HttpResponse;
use arc_swap::ArcSwap;
use async_stream::stream;
use futures::StreamExt;
use reqwest::Client;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const GENERATE_EMBED_TIMEOUT: Duration = Duration::from_secs(60);
const CHAT_TIMEOUT: Duration = Duration::from_secs(120);

/// Which upstream Ollama-compatible endpoint a forwarded call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Generate,
    Chat,
    Embed,
    Embeddings,
}

impl Endpoint {
    fn suffix(self) -> &'static str {
        match self {
            Endpoint::Generate => "/api/generate",
            Endpoint::Chat => "/api/chat",
            Endpoint::Embed => "/api/embed",
            Endpoint::Embeddings => "/api/embeddings",
        }
    }

    fn buffered_timeout(self) -> Duration {
        match self {
            Endpoint::Generate | Endpoint::Embed | Endpoint::Embeddings => GENERATE_EMBED_TIMEOUT,
            Endpoint::Chat => CHAT_TIMEOUT,
        }
    }

    fn streaming_content_type(self) -> &'static str {
        match self {
            Endpoint::Generate => "application/x-ndjson",
            _ => "application/json",
        }
    }
}

/// Releases a selector-held node's in-flight counter exactly once, even if
/// the stream is dropped mid-iteration (client disconnect) rather than
/// drained to completion.
struct ReleaseGuard {
    selector: Arc<Selector>,
    address: String,
    released: AtomicBool,
}

impl ReleaseGuard {
    fn new(selector: Arc<Selector>, address: String) -> Self {
        Self {
            selector,
            address,
            released: AtomicBool::new(false),
        }
    }

    async fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            if let Err(err) = self.selector.release(&self.address).await {
                warn!("forwarder: release failed for {}: {err}", self.address);
            }
        }
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if !self.released.load(Ordering::SeqCst) {
            let selector = self.selector.clone();
            let address = self.address.clone();
            tokio::spawn(async move {
                if let Err(err) = selector.release(&address).await {
                    warn!("forwarder: deferred release failed for {address}: {err}");
                }
            });
        }
    }
}

/// Forwards client requests to a selected upstream node.
pub struct Forwarder {
    selector: Arc<Selector>,
    client: Client,
    /// Client with no read timeout, dedicated to streaming calls (spec §4.7
    /// step 5) — the shared `client` carries a fixed per-endpoint timeout
    /// that would otherwise cut off a long-running stream.
    streaming_client: Client,
    strategy: Arc<ArcSwap<Strategy>>,
}

impl Forwarder {
    pub fn new(
        selector: Arc<Selector>,
        client: Client,
        streaming_client: Client,
        strategy: Arc<ArcSwap<Strategy>>,
    ) -> Self {
        Self { selector, client, streaming_client, strategy }
    }

    /// Forward a JSON body to `endpoint` on a selected node. `body` must
    /// already have passed `reject_node_id`.
    pub async fn forward(&self, req: &actix_web::HttpRequest, endpoint: Endpoint, body: Value) -> Result<HttpResponse> {
        reject_node_id(&body)?;

        let model = body.get("model").and_then(Value::as_str).map(str::to_string);
        let strategy = **self.strategy.load();
        let address = self.selector.acquire(model.as_deref(), strategy).await?;
        let guard = Arc::new(ReleaseGuard::new(self.selector.clone(), address.clone()));

        let streaming = body.get("stream").and_then(Value::as_bool).unwrap_or(false)
            && matches!(endpoint, Endpoint::Generate | Endpoint::Chat);

        let url = format!("{address}{}", endpoint.suffix());

        if streaming {
            self.forward_streaming(req, endpoint, &url, body, guard).await
        } else {
            let result = self.forward_buffered(req, endpoint, &url, body).await;
            guard.release().await;
            result
        }
    }

    async fn forward_buffered(
        &self,
        req: &actix_web::HttpRequest,
        endpoint: Endpoint,
        url: &str,
        body: Value,
    ) -> Result<HttpResponse> {
        let builder = copy_forwardable_headers(req, self.client.post(url));
        let response = builder
            .json(&body)
            .timeout(endpoint.buffered_timeout())
            .send()
            .await
            .map_err(transport_error)?;

        let status = actix_web::http::StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(actix_web::http::StatusCode::BAD_GATEWAY);
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_string();
        let bytes = response.bytes().await.map_err(transport_error)?;

        Ok(HttpResponse::build(status)
            .insert_header((actix_web::http::header::CONTENT_TYPE, content_type))
            .body(bytes))
    }

    async fn forward_streaming(
        &self,
        req: &actix_web::HttpRequest,
        endpoint: Endpoint,
        url: &str,
        body: Value,
        guard: Arc<ReleaseGuard>,
    ) -> Result<HttpResponse> {
        let builder = copy_forwardable_headers(req, self.streaming_client.post(url));
        let response = builder.json(&body).send().await.map_err(transport_error)?;

        if !response.status().is_success() {
            guard.release().await;
            return Err(ProxyError::UpstreamTransport(format!(
                "upstream returned status {}",
                response.status()
            )));
        }

        let mut upstream = response.bytes_stream();
        let body_stream = stream! {
            let _guard = guard;
            while let Some(chunk) = upstream.next().await {
                match chunk {
                    Ok(bytes) => yield Ok::<Bytes, actix_web::Error>(bytes),
                    Err(err) => {
                        warn!("forwarder: streaming chunk failed: {err}");
                        break;
                    }
                }
            }
        };

        Ok(HttpResponse::Ok()
            .insert_header((actix_web::http::header::CONTENT_TYPE, endpoint.streaming_content_type()))
            .streaming(body_stream))
    }
}

/// Reject any `node_id` field present in a forwarded request body — node
/// selection is the proxy's sole responsibility (spec §6).
pub fn reject_node_id(body: &Value) -> Result<()> {
    if body.get("node_id").is_some() {
        return Err(ProxyError::invalid_request("node_id is not allowed in forwarded requests"));
    }
    Ok(())
}

fn transport_error(err: reqwest::Error) -> ProxyError {
    if err.is_timeout() {
        ProxyError::UpstreamTimeout
    } else {
        ProxyError::UpstreamTransport(err.to_string())
    }
}

/// Copy client headers to the upstream request, dropping `host` and
/// `content-length` (spec §4.7 step 4).
pub fn copy_forwardable_headers(
    source: &actix_web::HttpRequest,
    builder: reqwest::RequestBuilder,
) -> reqwest::RequestBuilder {
    let mut builder = builder;
    for (name, value) in source.headers() {
        if name == actix_web::http::header::HOST || name == actix_web::http::header::CONTENT_LENGTH {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            builder = builder.header(name, value);
        }
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reject_node_id_present() {
        let body = json!({"model": "llama3", "node_id": 1});
        assert!(reject_node_id(&body).is_err());
    }

    #[test]
    fn test_reject_node_id_absent() {
        let body = json!({"model": "llama3"});
        assert!(reject_node_id(&body).is_ok());
    }

    #[test]
    fn test_endpoint_suffixes() {
        assert_eq!(Endpoint::Generate.suffix(), "/api/generate");
        assert_eq!(Endpoint::Chat.suffix(), "/api/chat");
        assert_eq!(Endpoint::Embed.suffix(), "/api/embed");
        assert_eq!(Endpoint::Embeddings.suffix(), "/api/embeddings");
    }

    #[test]
    fn test_streaming_content_type() {
        assert_eq!(Endpoint::Generate.streaming_content_type(), "application/x-ndjson");
        assert_eq!(Endpoint::Chat.streaming_content_type(), "application/json");
    }
}
