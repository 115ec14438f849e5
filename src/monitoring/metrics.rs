//! Prometheus metrics for the HA proxy (`metrics` feature; SPEC_FULL.md §10)
//!
//! Tracks the things an operator actually pages on: pool membership, per-node
//! in-flight counts and latency, probe outcomes, leader status, and request
//! volume/duration by route and status code. Exposed as plain-text
//! Prometheus exposition format on `GET /metrics` (spec §4.8 admin surface).

#![allow(dead_code)]

#[cfg(feature = "metrics")]
mod imp {
    use prometheus::{
        CounterVec, GaugeVec, HistogramVec, IntGauge, Opts, Registry, TextEncoder,
    };
    use tracing::warn;

    /// Collects and renders proxy metrics
    pub struct MetricsCollector {
        registry: Registry,
        pub requests_total: CounterVec,
        pub request_duration_seconds: HistogramVec,
        pub node_active_requests: GaugeVec,
        pub node_latency_seconds: GaugeVec,
        pub probe_failures_total: CounterVec,
        pub pool_size: GaugeVec,
        pub is_leader: IntGauge,
    }

    impl MetricsCollector {
        pub fn new() -> Self {
            let registry = Registry::new();

            let requests_total = CounterVec::new(
                Opts::new("proxy_requests_total", "Total forwarded requests by route and status"),
                &["route", "status"],
            )
            .expect("metric registration");

            let request_duration_seconds = HistogramVec::new(
                prometheus::HistogramOpts::new(
                    "proxy_request_duration_seconds",
                    "Forwarded request latency by route",
                ),
                &["route"],
            )
            .expect("metric registration");

            let node_active_requests = GaugeVec::new(
                Opts::new("proxy_node_active_requests", "In-flight requests per node address"),
                &["address"],
            )
            .expect("metric registration");

            let node_latency_seconds = GaugeVec::new(
                Opts::new("proxy_node_latency_seconds", "Last observed liveness-probe latency per node"),
                &["address"],
            )
            .expect("metric registration");

            let probe_failures_total = CounterVec::new(
                Opts::new("proxy_probe_failures_total", "Failed probes by node address and kind"),
                &["address", "kind"],
            )
            .expect("metric registration");

            let pool_size = GaugeVec::new(
                Opts::new("proxy_pool_size", "Number of node addresses per pool"),
                &["pool"],
            )
            .expect("metric registration");

            let is_leader = IntGauge::new("proxy_is_leader", "1 if this worker holds the scheduler leader lock")
                .expect("metric registration");

            for collector in [
                Box::new(requests_total.clone()) as Box<dyn prometheus::core::Collector>,
                Box::new(request_duration_seconds.clone()),
                Box::new(node_active_requests.clone()),
                Box::new(node_latency_seconds.clone()),
                Box::new(probe_failures_total.clone()),
                Box::new(pool_size.clone()),
                Box::new(is_leader.clone()),
            ] {
                if let Err(e) = registry.register(collector) {
                    warn!("failed to register metric: {e}");
                }
            }

            Self {
                registry,
                requests_total,
                request_duration_seconds,
                node_active_requests,
                node_latency_seconds,
                probe_failures_total,
                pool_size,
                is_leader,
            }
        }

        /// Record a completed forwarded request
        pub fn record_request(&self, route: &str, status: u16, duration_secs: f64) {
            self.requests_total
                .with_label_values(&[route, &status.to_string()])
                .inc();
            self.request_duration_seconds
                .with_label_values(&[route])
                .observe(duration_secs);
        }

        pub fn set_node_active(&self, address: &str, count: i64) {
            self.node_active_requests
                .with_label_values(&[address])
                .set(count as f64);
        }

        pub fn set_node_latency(&self, address: &str, latency_seconds: f64) {
            self.node_latency_seconds
                .with_label_values(&[address])
                .set(latency_seconds);
        }

        pub fn record_probe_failure(&self, address: &str, kind: &str) {
            self.probe_failures_total.with_label_values(&[address, kind]).inc();
        }

        pub fn set_pool_sizes(&self, active: usize, standby: usize) {
            self.pool_size.with_label_values(&["active"]).set(active as f64);
            self.pool_size.with_label_values(&["standby"]).set(standby as f64);
        }

        pub fn set_is_leader(&self, leader: bool) {
            self.is_leader.set(if leader { 1 } else { 0 });
        }

        /// Render current metrics in Prometheus text exposition format
        pub fn render(&self) -> String {
            let encoder = TextEncoder::new();
            let metric_families = self.registry.gather();
            encoder
                .encode_to_string(&metric_families)
                .unwrap_or_default()
        }
    }

    impl Default for MetricsCollector {
        fn default() -> Self {
            Self::new()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_render_includes_registered_metrics() {
            let collector = MetricsCollector::new();
            collector.record_request("/generate", 200, 0.05);
            collector.set_pool_sizes(2, 1);
            collector.set_is_leader(true);

            let rendered = collector.render();
            assert!(rendered.contains("proxy_requests_total"));
            assert!(rendered.contains("proxy_pool_size"));
            assert!(rendered.contains("proxy_is_leader 1"));
        }
    }
}

#[cfg(not(feature = "metrics"))]
mod imp {
    /// No-op collector when the `metrics` feature is disabled
    #[derive(Default)]
    pub struct MetricsCollector;

    impl MetricsCollector {
        pub fn new() -> Self {
            Self
        }
        pub fn record_request(&self, _route: &str, _status: u16, _duration_secs: f64) {}
        pub fn set_node_active(&self, _address: &str, _count: i64) {}
        pub fn set_node_latency(&self, _address: &str, _latency_seconds: f64) {}
        pub fn record_probe_failure(&self, _address: &str, _kind: &str) {}
        pub fn set_pool_sizes(&self, _active: usize, _standby: usize) {}
        pub fn set_is_leader(&self, _leader: bool) {}
        pub fn render(&self) -> String {
            String::new()
        }
    }
}

pub use imp::MetricsCollector;
