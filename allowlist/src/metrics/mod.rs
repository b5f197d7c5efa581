//! Metrics and instrumentation for batch runs.
//!
//! This module defines Prometheus-compatible metrics for the publishing
//! pipeline. A run is a short-lived process, so there is no exporter: the
//! registry is rendered in Prometheus text format once the run ends and
//! written next to the audit files (or wherever the operator asks).
//!
//! Typical usage in a binary:
//!
//! ```ignore
//! use allowlist::metrics::MetricsRegistry;
//!
//! let registry = MetricsRegistry::new()?;
//! let publisher = publisher.with_metrics(registry.pipeline.clone());
//! publisher.run(&path)?;
//! registry.write_text_file("metrics.prom".as_ref())?;
//! ```

pub mod prometheus;

pub use prometheus::{MetricsRegistry, PipelineMetrics};
