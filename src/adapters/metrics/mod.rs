//! Metrics Adapters
//!
//! Prometheus export of the bot's counters and gauges on `/metrics`
//! via axum 0.7.

pub mod prometheus;

pub use self::prometheus::PrometheusMetrics;
