//! Health & Model Prober (spec §4.3)
//!
//! Two independent HTTP probes against a node: a liveness ping against a
//! configurable `health_path`, and a catalog scrape of `/api/tags`.

use crate::config::ProxyConfig;
use crate::utils::error::Result;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const LIVENESS_TIMEOUT: Duration = Duration::from_secs(5);
const CATALOG_TIMEOUT: Duration = Duration::from_secs(5);
const CATALOG_ATTEMPTS: u32 = 2;
const CATALOG_BACKOFF_UNIT: Duration = Duration::from_millis(200);

/// Result of a liveness probe: whether the node responded with a
/// non-server-error status, and how long it took.
#[derive(Debug, Clone, Copy)]
pub struct LivenessResult {
    pub ok: bool,
    pub latency_seconds: f64,
}

impl LivenessResult {
    fn failed() -> Self {
        Self {
            ok: false,
            latency_seconds: f64::INFINITY,
        }
    }
}

/// Result of a catalog scrape: the model names advertised by `/api/tags`,
/// in the order the node returned them.
#[derive(Debug, Clone)]
pub struct CatalogResult {
    pub models: Vec<String>,
}

#[derive(serde::Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagsModel>,
}

#[derive(serde::Deserialize)]
struct TagsModel {
    name: String,
}

/// Probes node liveness and model catalogs over HTTP.
#[derive(Debug, Clone)]
pub struct Prober {
    client: Client,
    health_path: String,
}

impl Prober {
    pub fn new(client: Client, proxy_config: &ProxyConfig) -> Self {
        Self {
            client,
            health_path: proxy_config.health_path.clone(),
        }
    }

    fn liveness_url(&self, addr: &str) -> String {
        if self.health_path.is_empty() || self.health_path == "/" {
            addr.to_string()
        } else if self.health_path.starts_with('/') {
            format!("{addr}{}", self.health_path)
        } else {
            format!("{addr}/{}", self.health_path)
        }
    }

    /// `(ok, latency_seconds)`. `ok` iff the status code is in `[0, 500)`;
    /// any transport error counts as failure with infinite latency.
    pub async fn probe_liveness(&self, addr: &str) -> LivenessResult {
        let url = self.liveness_url(addr);
        let start = Instant::now();
        match self.client.get(&url).timeout(LIVENESS_TIMEOUT).send().await {
            Ok(resp) => {
                let elapsed = start.elapsed().as_secs_f64();
                let ok = resp.status().as_u16() < 500;
                LivenessResult {
                    ok,
                    latency_seconds: elapsed,
                }
            }
            Err(err) => {
                debug!("liveness probe failed for {addr}: {err}");
                LivenessResult::failed()
            }
        }
    }

    /// Scrape `/api/tags`, up to 2 attempts with ~0.2s * attempt backoff.
    pub async fn probe_catalog(&self, addr: &str) -> Result<CatalogResult> {
        let url = format!("{addr}/api/tags");
        let mut last_err = None;

        for attempt in 1..=CATALOG_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(CATALOG_BACKOFF_UNIT * attempt).await;
            }
            match self.client.get(&url).timeout(CATALOG_TIMEOUT).send().await {
                Ok(resp) if resp.status().is_success() => {
                    match resp.json::<TagsResponse>().await {
                        Ok(parsed) => {
                            return Ok(CatalogResult {
                                models: parsed.models.into_iter().map(|m| m.name).collect(),
                            });
                        }
                        Err(err) => last_err = Some(err.to_string()),
                    }
                }
                Ok(resp) => last_err = Some(format!("status {}", resp.status())),
                Err(err) => last_err = Some(err.to_string()),
            }
        }

        let reason = last_err.unwrap_or_else(|| "unknown error".to_string());
        warn!("catalog probe failed for {addr} after {CATALOG_ATTEMPTS} attempts: {reason}");
        Err(crate::utils::error::ProxyError::probe_failure(
            addr.to_string(),
            reason,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prober_with_path(path: &str) -> Prober {
        Prober {
            client: Client::new(),
            health_path: path.to_string(),
        }
    }

    #[test]
    fn test_liveness_url_empty_path_probes_root() {
        let prober = prober_with_path("");
        assert_eq!(prober.liveness_url("http://node:11434"), "http://node:11434");
    }

    #[test]
    fn test_liveness_url_slash_probes_root() {
        let prober = prober_with_path("/");
        assert_eq!(prober.liveness_url("http://node:11434"), "http://node:11434");
    }

    #[test]
    fn test_liveness_url_custom_path() {
        let prober = prober_with_path("/health");
        assert_eq!(
            prober.liveness_url("http://node:11434"),
            "http://node:11434/health"
        );
    }

    #[test]
    fn test_failed_liveness_result_has_infinite_latency() {
        let result = LivenessResult::failed();
        assert!(!result.ok);
        assert!(result.latency_seconds.is_infinite());
    }

    // Mocked-upstream coverage (spec §8 scenario 8: a node whose catalog
    // scrape fails is forced to standby regardless of liveness).
    mod mocked_upstream {
        use super::*;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        #[tokio::test]
        async fn test_probe_liveness_ok_against_mock_server() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/"))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;

            let prober = prober_with_path("");
            let result = prober.probe_liveness(&server.uri()).await;
            assert!(result.ok);
            assert!(result.latency_seconds.is_finite());
        }

        #[tokio::test]
        async fn test_probe_liveness_server_error_is_not_ok() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/"))
                .respond_with(ResponseTemplate::new(503))
                .mount(&server)
                .await;

            let prober = prober_with_path("");
            let result = prober.probe_liveness(&server.uri()).await;
            assert!(!result.ok);
        }

        #[tokio::test]
        async fn test_probe_catalog_success_returns_model_names() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/tags"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "models": [{"name": "llama3"}, {"name": "mistral"}]
                })))
                .mount(&server)
                .await;

            let prober = prober_with_path("");
            let catalog = prober.probe_catalog(&server.uri()).await.unwrap();
            assert_eq!(catalog.models, vec!["llama3".to_string(), "mistral".to_string()]);
        }

        #[tokio::test]
        async fn test_probe_catalog_failure_after_retries() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/tags"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;

            let prober = prober_with_path("");
            let result = prober.probe_catalog(&server.uri()).await;
            assert!(result.is_err());
        }
    }
}
