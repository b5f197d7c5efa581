//! Top-level configuration for a signing run.
//!
//! This module aggregates configuration for:
//!
//! - the JSON-RPC node holding the authority account (`RpcConfig`),
//! - the encryption network gateway (`KeyNetworkConfig`),
//! - the pinning service (`PinningConfig`),
//! - the signature API targets (`ApiConfig`),
//! - output layout and chunking (`OutputConfig`),
//! - the optional publication journal (`JournalConfig`),
//!
//! plus the identity strings, retry policy and failure policy. The goal is
//! to have a single `SignerConfig` struct that the binary can build from
//! defaults, command-line flags and environment variables, and validate
//! before anything touches the network.

use std::path::PathBuf;
use std::time::Duration;

use crate::clients::pinata::PINATA_PIN_JSON_URL;
use crate::credential::IdentityConfig;
use crate::pipeline::{DEFAULT_CHUNK_SIZE, FailurePolicy, PublisherConfig, RetryPolicy};
use crate::storage::RocksDbConfig;
use crate::types::Address;

/// Configuration errors, detected before any network call.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("chunk size must be at least 1")]
    ZeroChunkSize,
    #[error("no pinning service token configured (set PINATA_JWT)")]
    MissingPinningToken,
    #[error("--post-to-api and --post-to-dev-api are mutually exclusive")]
    ConflictingApiTargets,
    #[error("no {0} URL configured")]
    MissingApiUrl(&'static str),
    #[error("retry policy needs at least one attempt")]
    ZeroAttempts,
}

/// JSON-RPC node holding the authority account.
#[derive(Clone, Debug)]
pub struct RpcConfig {
    /// Node URL, e.g. `"http://127.0.0.1:8545"`.
    pub url: String,
    /// Authority account; the node's first account when unset.
    pub account: Option<Address>,
    /// Network name reported for the node's chain, overriding the
    /// built-in chain names.
    pub network_name: Option<String>,
    pub timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8545".to_string(),
            account: None,
            network_name: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Encryption network gateway.
#[derive(Clone, Debug)]
pub struct KeyNetworkConfig {
    pub gateway_url: String,
    pub timeout: Duration,
}

impl Default for KeyNetworkConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://127.0.0.1:7470".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Pinning service endpoint and credentials.
#[derive(Clone, Debug)]
pub struct PinningConfig {
    pub endpoint: String,
    /// Bearer token; required.
    pub jwt: Option<String>,
    pub timeout: Duration,
}

impl Default for PinningConfig {
    fn default() -> Self {
        Self {
            endpoint: PINATA_PIN_JSON_URL.to_string(),
            jwt: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Where finished audit files are forwarded, if anywhere.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ApiTarget {
    #[default]
    None,
    Production,
    Development,
}

impl ApiTarget {
    /// Maps the two mutually exclusive command-line flags onto a target.
    pub fn from_flags(post_to_api: bool, post_to_dev_api: bool) -> Result<Self, ConfigError> {
        match (post_to_api, post_to_dev_api) {
            (true, true) => Err(ConfigError::ConflictingApiTargets),
            (true, false) => Ok(ApiTarget::Production),
            (false, true) => Ok(ApiTarget::Development),
            (false, false) => Ok(ApiTarget::None),
        }
    }
}

/// Signature API base URLs.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub url: Option<String>,
    pub dev_url: Option<String>,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: None,
            dev_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Output layout.
#[derive(Clone, Debug)]
pub struct OutputConfig {
    /// Directory receiving `signatures-<i>.json`.
    pub dir: PathBuf,
    /// Addresses per audit file.
    pub chunk_size: usize,
    /// Where to write the Prometheus text dump, if anywhere.
    pub metrics_out: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("signatures"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            metrics_out: None,
        }
    }
}

/// Publication journal location; disabled when unset.
#[derive(Clone, Debug, Default)]
pub struct JournalConfig {
    pub path: Option<PathBuf>,
}

impl JournalConfig {
    pub fn rocksdb(&self) -> Option<RocksDbConfig> {
        self.path.as_ref().map(|path| RocksDbConfig {
            path: path.clone(),
            create_if_missing: true,
        })
    }
}

/// Top-level configuration for a signing run.
#[derive(Clone, Debug, Default)]
pub struct SignerConfig {
    pub rpc: RpcConfig,
    pub key_network: KeyNetworkConfig,
    pub pinning: PinningConfig,
    pub api: ApiConfig,
    pub api_target: ApiTarget,
    pub identity: IdentityConfig,
    pub output: OutputConfig,
    pub retry: RetryPolicy,
    pub on_failure: FailurePolicy,
    pub journal: JournalConfig,
}

impl SignerConfig {
    /// Rejects configurations that cannot possibly complete a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self
            .pinning
            .jwt
            .as_deref()
            .is_none_or(|jwt| jwt.trim().is_empty())
        {
            return Err(ConfigError::MissingPinningToken);
        }
        match self.api_target {
            ApiTarget::Production if self.api.url.is_none() => {
                Err(ConfigError::MissingApiUrl("signature API"))
            }
            ApiTarget::Development if self.api.dev_url.is_none() => {
                Err(ConfigError::MissingApiUrl("development signature API"))
            }
            _ => Ok(()),
        }
    }

    /// Base URL of the selected API target.
    pub fn api_url(&self) -> Option<&str> {
        match self.api_target {
            ApiTarget::None => None,
            ApiTarget::Production => self.api.url.as_deref(),
            ApiTarget::Development => self.api.dev_url.as_deref(),
        }
    }

    /// Knobs handed to the batch publisher.
    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            chunk_size: self.output.chunk_size,
            retry: self.retry.clone(),
            on_failure: self.on_failure,
            output_dir: self.output.dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> SignerConfig {
        let mut cfg = SignerConfig::default();
        cfg.pinning.jwt = Some("jwt".to_string());
        cfg
    }

    #[test]
    fn defaults_match_the_classic_layout() {
        let cfg = SignerConfig::default();
        assert_eq!(cfg.output.dir, PathBuf::from("signatures"));
        assert_eq!(cfg.output.chunk_size, 10);
        assert_eq!(cfg.retry.max_attempts, 1);
        assert_eq!(cfg.on_failure, FailurePolicy::Abort);
        assert_eq!(cfg.api_target, ApiTarget::None);
        assert!(cfg.journal.rocksdb().is_none());
    }

    #[test]
    fn validation_rejects_unusable_configs() {
        assert_eq!(valid().validate(), Ok(()));

        let mut cfg = valid();
        cfg.output.chunk_size = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroChunkSize));

        let mut cfg = valid();
        cfg.pinning.jwt = Some("  ".to_string());
        assert_eq!(cfg.validate(), Err(ConfigError::MissingPinningToken));

        let mut cfg = valid();
        cfg.api_target = ApiTarget::Development;
        assert!(matches!(cfg.validate(), Err(ConfigError::MissingApiUrl(_))));
        cfg.api.dev_url = Some("https://dev.example".to_string());
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(cfg.api_url(), Some("https://dev.example"));
    }

    #[test]
    fn api_flags_are_mutually_exclusive() {
        assert_eq!(ApiTarget::from_flags(false, false), Ok(ApiTarget::None));
        assert_eq!(ApiTarget::from_flags(true, false), Ok(ApiTarget::Production));
        assert_eq!(ApiTarget::from_flags(false, true), Ok(ApiTarget::Development));
        assert_eq!(
            ApiTarget::from_flags(true, true),
            Err(ConfigError::ConflictingApiTargets)
        );
    }

    #[test]
    fn publisher_config_carries_output_and_policies() {
        let mut cfg = valid();
        cfg.output.chunk_size = 4;
        cfg.on_failure = FailurePolicy::SkipAddress;
        cfg.journal.path = Some(PathBuf::from("/tmp/journal"));

        let publisher = cfg.publisher_config();
        assert_eq!(publisher.chunk_size, 4);
        assert_eq!(publisher.on_failure, FailurePolicy::SkipAddress);
        assert_eq!(publisher.output_dir, PathBuf::from("signatures"));
        assert_eq!(
            cfg.journal.rocksdb().map(|r| r.path),
            Some(PathBuf::from("/tmp/journal"))
        );
    }
}
