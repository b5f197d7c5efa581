// signer/src/main.rs

//! `generate-signatures` binary.
//!
//! Signs a commitment for every address of an allow-list file, seals each
//! signature so that only its participant can recover it, pins the sealed
//! credentials and writes one `signatures-<i>.json` audit file per chunk.
//!
//! Everything runs sequentially; the first failure aborts the run (unless
//! `--on-failure skip` is given) and the process exits with status 1.

mod config;

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use allowlist::{
    AuctionRef, AuthContext, CommitmentBuilder, CredentialSealer, DefaultBatchPublisher,
    HttpKeyNetwork, JsonRpcClient, MetricsRegistry, PinataClient, RocksDbJournal,
    SignatureApiClient,
};
use config::Cli;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "generate_signatures=info,allowlist=info".to_string()),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("fatal error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let started = Instant::now();
    let (args, config) = Cli::parse().into_run()?;
    info!(
        auction_id = args.auction_id,
        file = %args.file_with_address.display(),
        post_to_api = args.post_to_api,
        post_to_dev_api = args.post_to_dev_api,
        "generating signatures"
    );

    // ---------------------------
    // Authority + network identity
    // ---------------------------

    let mut rpc =
        JsonRpcClient::connect(&config.rpc.url, config.rpc.timeout, config.rpc.account.clone())
            .with_context(|| format!("failed to reach JSON-RPC node at {}", config.rpc.url))?;
    if let Some(name) = &config.rpc.network_name {
        rpc = rpc.with_network_name(name);
    }

    let auth = AuthContext::establish(&rpc, &rpc, &config.identity, args.auction_id)
        .context("failed to establish run identity")?;

    let auction = AuctionRef {
        auction_id: args.auction_id,
        chain_id: auth.network.chain_id,
        allow_list_contract: args.allow_list_contract.clone(),
    };
    let commitments = CommitmentBuilder::new(&auction, &config.identity)?;

    // ---------------------------
    // External services
    // ---------------------------

    let key_network = HttpKeyNetwork::new(&config.key_network.gateway_url, config.key_network.timeout)?;
    let sealer = CredentialSealer::connect(key_network)
        .context("failed to connect to the encryption network")?;

    let jwt = config.pinning.jwt.clone().unwrap_or_default();
    let pinning = PinataClient::new(&config.pinning.endpoint, jwt, config.pinning.timeout)?;

    let metrics = MetricsRegistry::new().context("failed to initialise metrics registry")?;

    // ---------------------------
    // Publisher
    // ---------------------------

    let mut publisher: DefaultBatchPublisher = DefaultBatchPublisher::new(
        config.publisher_config(),
        auction,
        commitments,
        auth,
        rpc,
        sealer,
        pinning,
    )?
    .with_metrics(metrics.pipeline.clone());

    if let Some(rocks) = config.journal.rocksdb() {
        let journal = RocksDbJournal::open(&rocks).with_context(|| {
            format!("failed to open publication journal at {}", rocks.path.display())
        })?;
        publisher = publisher.with_journal(journal);
        info!(path = %rocks.path.display(), "publication journal enabled");
    }

    if let Some(url) = config.api_url() {
        let api = SignatureApiClient::new(url, config.api.timeout)?;
        info!(endpoint = %api.endpoint(), "forwarding audit files");
        publisher = publisher.with_forwarder(api);
    }

    let outcome = publisher.run(&args.file_with_address);

    if let Some(path) = &config.output.metrics_out {
        metrics
            .write_text_file(path)
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
    }

    let summary = outcome?;
    info!(
        auction_id = args.auction_id,
        chunks = summary.chunks_written,
        published = summary.addresses_processed,
        resumed = summary.addresses_resumed,
        skipped = summary.skipped.len(),
        elapsed = ?started.elapsed(),
        "signatures generated"
    );
    for skipped in &summary.skipped {
        tracing::warn!(
            chunk = skipped.chunk,
            position = skipped.position,
            address = %skipped.address,
            stage = %skipped.stage,
            error = %skipped.error,
            "address was skipped"
        );
    }

    Ok(())
}
