//! Command-line configuration of `generate-signatures`.
//!
//! Flags are parsed with clap; endpoints and secrets can also come from the
//! environment. Everything is turned into a validated [`RunArgs`] plus an
//! [`allowlist::SignerConfig`] before any network call is made.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;

use allowlist::clients::pinata::PINATA_PIN_JSON_URL;
use allowlist::{
    Address, ApiTarget, FailurePolicy, IdentityConfig, JournalConfig, RetryPolicy, SignerConfig,
};

/// Generates, seals and publishes allow-list signatures for one auction.
#[derive(Debug, Parser)]
#[command(name = "generate-signatures", version, about)]
pub struct Cli {
    /// Auction the signatures are generated for.
    #[arg(long, alias = "auctionId")]
    pub auction_id: u64,

    /// File with comma-separated participant addresses.
    #[arg(long, alias = "fileWithAddress")]
    pub file_with_address: PathBuf,

    /// Allow-list contract the signatures are verified by.
    #[arg(long, env = "ALLOWLIST_CONTRACT")]
    pub allow_list_contract: String,

    /// Also send every audit file to the signature API.
    #[arg(long, alias = "postToApi", conflicts_with = "post_to_dev_api")]
    pub post_to_api: bool,

    /// Also send every audit file to the development signature API.
    #[arg(long, alias = "postToDevApi")]
    pub post_to_dev_api: bool,

    /// JSON-RPC endpoint of the node holding the authority account.
    #[arg(long, env = "ALLOWLIST_RPC_URL", default_value = "http://127.0.0.1:8545")]
    pub rpc_url: String,

    /// Authority account; defaults to the node's first account.
    #[arg(long, env = "ALLOWLIST_AUTHORITY")]
    pub authority: Option<String>,

    /// Network name used for chains outside the built-in table.
    #[arg(long, env = "ALLOWLIST_NETWORK_NAME")]
    pub network_name: Option<String>,

    /// Encryption network gateway.
    #[arg(long, env = "ALLOWLIST_KEY_NETWORK_URL", default_value = "http://127.0.0.1:7470")]
    pub key_network_url: String,

    /// Pinning service endpoint.
    #[arg(long, env = "PINATA_URL", default_value = PINATA_PIN_JSON_URL)]
    pub pinata_url: String,

    /// Pinning service token.
    #[arg(long, env = "PINATA_JWT", hide_env_values = true)]
    pub pinata_jwt: Option<String>,

    /// Signature API base URL.
    #[arg(long, env = "ALLOWLIST_API_URL")]
    pub api_url: Option<String>,

    /// Development signature API base URL.
    #[arg(long, env = "ALLOWLIST_DEV_API_URL")]
    pub dev_api_url: Option<String>,

    /// Directory receiving the audit files.
    #[arg(long, default_value = "signatures")]
    pub output_dir: PathBuf,

    /// Addresses per audit file.
    #[arg(long, default_value_t = 10)]
    pub chunk_size: usize,

    /// Attempts per external call, including the first.
    #[arg(long, default_value_t = 1)]
    pub retry_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    #[arg(long, default_value_t = 500)]
    pub retry_backoff_ms: u64,

    /// What to do with an address that failed: `abort` or `skip`.
    #[arg(long, default_value = "abort")]
    pub on_failure: FailurePolicy,

    /// Publication journal (RocksDB directory) enabling resumable runs.
    #[arg(long, env = "ALLOWLIST_JOURNAL")]
    pub journal: Option<PathBuf>,

    /// Write Prometheus metrics to this file when the run ends.
    #[arg(long)]
    pub metrics_out: Option<PathBuf>,

    /// Timeout of every HTTP request, in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

/// Validated task arguments.
#[derive(Clone, Debug)]
pub struct RunArgs {
    pub auction_id: u64,
    pub file_with_address: PathBuf,
    pub allow_list_contract: Address,
    pub post_to_api: bool,
    pub post_to_dev_api: bool,
}

impl Cli {
    /// Splits the command line into run arguments and run configuration.
    pub fn into_run(self) -> Result<(RunArgs, SignerConfig)> {
        if !self.file_with_address.is_file() {
            bail!(
                "address file {} does not exist",
                self.file_with_address.display()
            );
        }
        let allow_list_contract = Address::parse(&self.allow_list_contract)
            .context("invalid --allow-list-contract")?;
        let authority = self
            .authority
            .as_deref()
            .map(Address::parse)
            .transpose()
            .context("invalid --authority")?;

        let timeout = Duration::from_secs(self.timeout_secs);
        let mut config = SignerConfig {
            api_target: ApiTarget::from_flags(self.post_to_api, self.post_to_dev_api)?,
            identity: IdentityConfig::default(),
            retry: RetryPolicy {
                max_attempts: self.retry_attempts,
                initial_backoff: Duration::from_millis(self.retry_backoff_ms),
                ..RetryPolicy::default()
            },
            on_failure: self.on_failure,
            journal: JournalConfig { path: self.journal },
            ..SignerConfig::default()
        };
        config.rpc.url = self.rpc_url;
        config.rpc.account = authority;
        config.rpc.network_name = self.network_name;
        config.rpc.timeout = timeout;
        config.key_network.gateway_url = self.key_network_url;
        config.key_network.timeout = timeout;
        config.pinning.endpoint = self.pinata_url;
        config.pinning.jwt = self.pinata_jwt;
        config.pinning.timeout = timeout;
        config.api.url = self.api_url;
        config.api.dev_url = self.dev_api_url;
        config.api.timeout = timeout;
        config.output.dir = self.output_dir;
        config.output.chunk_size = self.chunk_size;
        config.output.metrics_out = self.metrics_out;
        config.validate()?;

        let args = RunArgs {
            auction_id: self.auction_id,
            file_with_address: self.file_with_address,
            allow_list_contract,
            post_to_api: self.post_to_api,
            post_to_dev_api: self.post_to_dev_api,
        };
        Ok((args, config))
    }
}
