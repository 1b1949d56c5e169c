//! Observability module
//!
//! - Metrics collection (`metrics` facade, optional Prometheus exporter)
//! - Event-tagged structured logging
//! - Subscriber / exporter bootstrap

pub mod metrics_collector;
pub mod structured_logger;
pub mod telemetry_setup;

pub use metrics_collector::MetricsCollector;
pub use structured_logger::{LogFormat, LoggingConfig, StructuredLogger};
pub use telemetry_setup::{init_metrics, init_structured_logging};
