//! Allow-list credential library.
//!
//! This crate provides the building blocks for issuing per-participant
//! credentials for a permissioned auction: the auction authority signs a
//! commitment to `(allow-list contract, chain, auction, participant)`, the
//! signature is sealed so that only the participant can recover it, and
//! the sealed credential is pinned on a content-addressed store.
//!
//! - strongly-typed domain types (`types`),
//! - the per-participant credential components (`credential`),
//! - the sequential batch pipeline (`pipeline`),
//! - audit files and the publication journal (`storage`),
//! - HTTP clients for the external services (`clients`),
//! - Prometheus-based metrics (`metrics`),
//! - and a top-level run configuration (`config`).
//!
//! The `generate-signatures` binary composes these pieces into the
//! command-line task.

pub mod clients;
pub mod config;
pub mod credential;
pub mod metrics;
pub mod pipeline;
pub mod storage;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-export top-level configuration types.
pub use config::{
    ApiConfig, ApiTarget, ConfigError, JournalConfig, KeyNetworkConfig, OutputConfig,
    PinningConfig, RpcConfig, SignerConfig,
};

// Re-export the credential components.
pub use credential::{
    AuthContext, AuthoritySigner, ChainClient, CommitmentBuilder, CredentialError,
    CredentialSealer, IdentityConfig, KeyNetwork, NetworkTable,
};

// Re-export the pipeline.
pub use pipeline::{
    AuditForwarder, BatchPublisher, BatchState, FailurePolicy, PinningService, PipelineError,
    PublisherConfig, RetryPolicy, RunSummary, Stage,
};

// Re-export storage backends.
pub use storage::{
    AuditDirectory, InMemoryJournal, PublicationJournal, RocksDbConfig, RocksDbJournal,
    StorageError,
};

// Re-export HTTP clients.
pub use clients::{HttpKeyNetwork, JsonRpcClient, PinataClient, SignatureApiClient};

// Re-export metrics registry and pipeline metrics.
pub use metrics::{MetricsRegistry, PipelineMetrics};

// Re-export domain types at the crate root for convenience.
pub use types::*;

/// Publisher stack used by the command-line task.
pub type DefaultBatchPublisher = BatchPublisher<JsonRpcClient, HttpKeyNetwork, PinataClient>;
