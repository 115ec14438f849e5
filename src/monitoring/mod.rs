//! Monitoring and observability
//!
//! Optional (`metrics` feature) Prometheus counters/gauges for pool size,
//! in-flight counts, probe latency, and leader status (spec §2 ambient
//! stack; SPEC_FULL.md §10).

pub mod metrics;

pub use metrics::MetricsCollector;
