//! Prometheus-backed pipeline metrics.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and a set of strongly-typed pipeline metrics.

use std::fs;
use std::path::Path;

use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

use crate::credential::CredentialError;

/// Pipeline-related Prometheus metrics.
///
/// Registered into a [`Registry`] and updated by the batch publisher.
#[derive(Clone)]
pub struct PipelineMetrics {
    /// End-to-end time to process one address (commit → record), in seconds.
    pub address_seconds: Histogram,
    /// Addresses published in this run.
    pub addresses_published: IntCounter,
    /// Addresses skipped because the journal already had them.
    pub addresses_resumed: IntCounter,
    /// Addresses that failed for good, by stage.
    pub address_failures: IntCounterVec,
    /// Retries of a stage after a transient failure, by stage.
    pub stage_retries: IntCounterVec,
    /// Chunk audit files written.
    pub chunks_written: IntCounter,
}

impl PipelineMetrics {
    /// Registers pipeline metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let address_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "pipeline_address_seconds",
                "Time to sign, seal and publish one address in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(address_seconds.clone()))?;

        let addresses_published = IntCounter::with_opts(Opts::new(
            "pipeline_addresses_published",
            "Total number of addresses whose credential was pinned in this run",
        ))?;
        registry.register(Box::new(addresses_published.clone()))?;

        let addresses_resumed = IntCounter::with_opts(Opts::new(
            "pipeline_addresses_resumed",
            "Total number of addresses taken from the publication journal",
        ))?;
        registry.register(Box::new(addresses_resumed.clone()))?;

        let address_failures = IntCounterVec::new(
            Opts::new(
                "pipeline_address_failures",
                "Total number of addresses that failed, by stage",
            ),
            &["stage"],
        )?;
        registry.register(Box::new(address_failures.clone()))?;

        let stage_retries = IntCounterVec::new(
            Opts::new(
                "pipeline_stage_retries",
                "Total number of retried stage attempts, by stage",
            ),
            &["stage"],
        )?;
        registry.register(Box::new(stage_retries.clone()))?;

        let chunks_written = IntCounter::with_opts(Opts::new(
            "pipeline_chunks_written",
            "Total number of chunk audit files written",
        ))?;
        registry.register(Box::new(chunks_written.clone()))?;

        Ok(Self {
            address_seconds,
            addresses_published,
            addresses_resumed,
            address_failures,
            stage_retries,
            chunks_written,
        })
    }
}

/// Wrapper around a Prometheus registry and the pipeline metrics.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub pipeline: PipelineMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers the pipeline metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("allowlist".to_string()), None)?;
        let pipeline = PipelineMetrics::register(&registry)?;
        Ok(Self { registry, pipeline })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!(error = %e, "failed to encode Prometheus metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// Writes [`Self::gather_text`] to `path`.
    pub fn write_text_file(&self, path: &Path) -> Result<(), CredentialError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CredentialError::fs(parent, e))?;
        }
        fs::write(path, self.gather_text()).map_err(|e| CredentialError::fs(path, e))
    }
}
