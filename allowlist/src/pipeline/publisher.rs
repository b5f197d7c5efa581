//! Batch orchestration.
//!
//! The [`BatchPublisher`] drives an address list through the credential
//! components, chunk by chunk:
//!
//! ```text
//! Idle → ReadingInput → ProcessingChunk(i) → ProcessingAddress(i, j) … →
//!        WritingAudit(i) → ProcessingChunk(i + 1) … → Done
//! ```
//!
//! Processing is strictly sequential. A chunk's audit file is written only
//! after every address of the chunk has been published, so an aborted run
//! never leaves a partial audit file behind. On failure the publisher stays
//! in the state it failed in.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::credential::{
    AuthContext, AuthoritySigner, CommitmentBuilder, CredentialError, CredentialSealer,
    KeyNetwork, encode_policy, sign_commitment,
};
use crate::metrics::PipelineMetrics;
use crate::storage::{AuditDirectory, JournalEntry, JournalKey, PublicationJournal};
use crate::types::{Address, AuctionRef, ChunkAuditFile, PublicationRecord, SignatureEntry};

use super::input::{chunk_count, read_address_file};
use super::retry::{FailurePolicy, RetryPolicy};
use super::stage::{PipelineError, Stage};
use super::upload::{AuditForwarder, PinningService};

/// Default number of addresses per audit file.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Run-level knobs of the publisher.
#[derive(Clone, Debug)]
pub struct PublisherConfig {
    /// Addresses per chunk; must be at least 1.
    pub chunk_size: usize,
    /// Retry policy applied to every external stage.
    pub retry: RetryPolicy,
    /// What to do once an address failed for good.
    pub on_failure: FailurePolicy,
    /// Directory receiving `signatures-<i>.json`.
    pub output_dir: PathBuf,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry: RetryPolicy::default(),
            on_failure: FailurePolicy::default(),
            output_dir: PathBuf::from("."),
        }
    }
}

/// Where the publisher currently is.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BatchState {
    Idle,
    ReadingInput,
    ProcessingChunk { chunk: usize },
    ProcessingAddress { chunk: usize, position: usize },
    WritingAudit { chunk: usize },
    Done,
}

/// An address left out of its chunk under [`FailurePolicy::SkipAddress`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SkippedAddress {
    pub chunk: usize,
    pub position: usize,
    pub address: String,
    pub stage: Stage,
    pub error: String,
}

/// Outcome of a completed run.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    /// Audit files written.
    pub chunks_written: usize,
    /// Addresses signed, sealed and pinned in this run.
    pub addresses_processed: usize,
    /// Addresses taken from the publication journal instead.
    pub addresses_resumed: usize,
    /// Addresses left out under [`FailurePolicy::SkipAddress`].
    pub skipped: Vec<SkippedAddress>,
    /// Addresses published and listed in their audit file whose journal
    /// write failed under [`FailurePolicy::SkipAddress`]; a re-run
    /// publishes them again.
    pub unrecorded: Vec<String>,
    /// Paths of the audit files, in chunk order.
    pub audit_files: Vec<PathBuf>,
}

enum AddressOutcome {
    Published(SignatureEntry),
    Resumed(SignatureEntry),
    /// Pinned, but the journal write failed.
    Unrecorded(SignatureEntry, CredentialError),
}

/// Sequential signer/sealer/publisher for one auction.
///
/// This struct is generic over:
///
/// - `S`: the authority's external signer ([`AuthoritySigner`]),
/// - `K`: the encryption network behind the [`CredentialSealer`],
/// - `P`: the pinning service ([`PinningService`]).
pub struct BatchPublisher<S, K, P> {
    config: PublisherConfig,
    auction: AuctionRef,
    commitments: CommitmentBuilder,
    auth: AuthContext,
    signer: S,
    sealer: CredentialSealer<K>,
    pinning: P,
    audit: AuditDirectory,
    journal: Option<Box<dyn PublicationJournal>>,
    forwarder: Option<Box<dyn AuditForwarder>>,
    metrics: Option<PipelineMetrics>,
    state: BatchState,
}

impl<S, K, P> BatchPublisher<S, K, P>
where
    S: AuthoritySigner,
    K: KeyNetwork,
    P: PinningService,
{
    /// Creates a publisher for `auction`.
    ///
    /// Fails if the chunk size is zero or if the run identity was
    /// established on a different chain than the auction's.
    pub fn new(
        config: PublisherConfig,
        auction: AuctionRef,
        commitments: CommitmentBuilder,
        auth: AuthContext,
        signer: S,
        sealer: CredentialSealer<K>,
        pinning: P,
    ) -> Result<Self, PipelineError> {
        if config.chunk_size == 0 {
            return Err(PipelineError::Config(
                "chunk size must be at least 1".to_string(),
            ));
        }
        if auth.network.chain_id != auction.chain_id {
            return Err(PipelineError::Config(format!(
                "authentication was issued for chain {} but the auction lives on chain {}",
                auth.network.chain_id, auction.chain_id
            )));
        }

        let audit = AuditDirectory::new(config.output_dir.clone());
        Ok(Self {
            config,
            auction,
            commitments,
            auth,
            signer,
            sealer,
            pinning,
            audit,
            journal: None,
            forwarder: None,
            metrics: None,
            state: BatchState::Idle,
        })
    }

    /// Enables resume: addresses found in `journal` are not published again.
    pub fn with_journal(mut self, journal: impl PublicationJournal + 'static) -> Self {
        self.journal = Some(Box::new(journal));
        self
    }

    /// Sends every finished audit file to `forwarder` as well.
    pub fn with_forwarder(mut self, forwarder: impl AuditForwarder + 'static) -> Self {
        self.forwarder = Some(Box::new(forwarder));
        self
    }

    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn auction(&self) -> &AuctionRef {
        &self.auction
    }

    pub fn audit_directory(&self) -> &AuditDirectory {
        &self.audit
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    pub fn sealer(&self) -> &CredentialSealer<K> {
        &self.sealer
    }

    pub fn pinning(&self) -> &P {
        &self.pinning
    }

    /// Reads the comma-separated address file at `source` and publishes it.
    pub fn run(&mut self, source: &Path) -> Result<RunSummary, PipelineError> {
        self.state = BatchState::ReadingInput;
        let addresses = read_address_file(source).map_err(PipelineError::Input)?;
        info!(
            source = %source.display(),
            addresses = addresses.len(),
            "address list loaded"
        );
        self.run_addresses(&addresses)
    }

    /// Publishes an already split address list.
    pub fn run_addresses(&mut self, addresses: &[String]) -> Result<RunSummary, PipelineError> {
        let chunk_size = self.config.chunk_size;
        let mut summary = RunSummary::default();

        info!(
            auction_id = self.auction.auction_id,
            chain_id = self.auction.chain_id,
            network = %self.auth.network.name,
            addresses = addresses.len(),
            chunks = chunk_count(addresses.len(), chunk_size),
            chunk_size,
            "starting batch run"
        );

        for (chunk, batch) in addresses.chunks(chunk_size).enumerate() {
            self.state = BatchState::ProcessingChunk { chunk };
            info!(chunk, addresses = batch.len(), "creating signatures for chunk");

            let mut signatures = Vec::with_capacity(batch.len());
            for (position, raw) in batch.iter().enumerate() {
                self.state = BatchState::ProcessingAddress { chunk, position };
                let started = Instant::now();

                match self.process_address(raw) {
                    Ok(AddressOutcome::Published(entry)) => {
                        summary.addresses_processed += 1;
                        if let Some(m) = &self.metrics {
                            m.addresses_published.inc();
                            m.address_seconds.observe(started.elapsed().as_secs_f64());
                        }
                        signatures.push(entry);
                    }
                    Ok(AddressOutcome::Resumed(entry)) => {
                        summary.addresses_resumed += 1;
                        if let Some(m) = &self.metrics {
                            m.addresses_resumed.inc();
                        }
                        signatures.push(entry);
                    }
                    Ok(AddressOutcome::Unrecorded(entry, source)) => {
                        self.record_failure(Stage::Record);
                        if self.config.on_failure == FailurePolicy::Abort {
                            return Err(abort(chunk, position, entry.user, Stage::Record, source));
                        }
                        // The sealed credential is already public, so the
                        // address stays in the audit file.
                        warn!(
                            chunk,
                            position,
                            address = %entry.user,
                            error = %source,
                            "credential published but not journaled"
                        );
                        summary.addresses_processed += 1;
                        summary.unrecorded.push(entry.user.clone());
                        if let Some(m) = &self.metrics {
                            m.addresses_published.inc();
                        }
                        signatures.push(entry);
                    }
                    Err((stage, source)) => {
                        self.record_failure(stage);
                        let address = raw.trim().to_string();

                        match self.config.on_failure {
                            FailurePolicy::Abort => {
                                return Err(abort(chunk, position, address, stage, source));
                            }
                            FailurePolicy::SkipAddress => {
                                warn!(
                                    chunk,
                                    position,
                                    address = %address,
                                    %stage,
                                    error = %source,
                                    "skipping address"
                                );
                                summary.skipped.push(SkippedAddress {
                                    chunk,
                                    position,
                                    address,
                                    stage,
                                    error: source.to_string(),
                                });
                            }
                        }
                    }
                }
            }

            self.state = BatchState::WritingAudit { chunk };
            let path = self.write_audit(chunk, signatures)?;
            summary.chunks_written += 1;
            summary.audit_files.push(path);
        }

        self.state = BatchState::Done;
        info!(
            chunks = summary.chunks_written,
            published = summary.addresses_processed,
            resumed = summary.addresses_resumed,
            skipped = summary.skipped.len(),
            unrecorded = summary.unrecorded.len(),
            "batch run complete"
        );
        Ok(summary)
    }

    fn record_failure(&self, stage: Stage) {
        if let Some(m) = &self.metrics {
            m.address_failures
                .with_label_values(&[stage.as_str()])
                .inc();
        }
    }

    /// Writes (and optionally forwards) one chunk's audit file.
    fn write_audit(
        &self,
        chunk: usize,
        signatures: Vec<SignatureEntry>,
    ) -> Result<PathBuf, PipelineError> {
        let audit = ChunkAuditFile::new(&self.auction, signatures);
        let path = self
            .audit
            .write_chunk(chunk, &audit)
            .map_err(|source| PipelineError::Chunk {
                chunk,
                stage: Stage::Audit,
                source,
            })?;
        if let Some(m) = &self.metrics {
            m.chunks_written.inc();
        }
        info!(
            chunk,
            signatures = audit.signatures.len(),
            path = %path.display(),
            "audit file written"
        );

        if let Some(forwarder) = &self.forwarder {
            self.with_retry(Stage::Forward, || {
                forwarder.forward(&audit).map_err(CredentialError::from)
            })
            .map_err(|source| PipelineError::Chunk {
                chunk,
                stage: Stage::Forward,
                source,
            })?;
            debug!(chunk, "audit file forwarded");
        }

        Ok(path)
    }

    /// Runs one address through commit → sign → policy → seal → upload →
    /// record.
    fn process_address(&self, raw: &str) -> Result<AddressOutcome, (Stage, CredentialError)> {
        // 1. Validate, commit and, when resuming, look the commitment up.
        let address = Address::parse(raw).map_err(|e| (Stage::Commit, CredentialError::from(e)))?;
        let commitment = self.commitments.commit(&address);
        let key = JournalKey::new(&commitment);

        if let Some(journal) = &self.journal {
            let known = journal
                .get(&key)
                .map_err(|e| (Stage::Resume, CredentialError::from(e)))?;
            if let Some(entry) = known {
                debug!(address = %address, "already published, reusing journal entry");
                return Ok(AddressOutcome::Resumed(SignatureEntry {
                    user: address.as_str().to_string(),
                    signature: entry.signature,
                }));
            }
        }

        // 2. Sign.
        let signature = self
            .with_retry(Stage::Sign, || sign_commitment(&self.signer, &commitment))
            .map_err(|e| (Stage::Sign, e))?;

        // 3. Bind the signature to the participant and seal it.
        let policy =
            encode_policy(&address, &self.auth.network.name).map_err(|e| (Stage::Policy, e))?;
        let sealed = self
            .with_retry(Stage::Seal, || {
                self.sealer.seal(
                    &signature,
                    &policy,
                    &self.auth.auth_sig,
                    &self.auth.network.name,
                )
            })
            .map_err(|e| (Stage::Seal, e))?;

        // 4. Publish.
        let record = PublicationRecord::new(&self.auction, &address, &sealed);
        let receipt = self
            .with_retry(Stage::Upload, || {
                self.pinning.pin_json(&record).map_err(CredentialError::from)
            })
            .map_err(|e| (Stage::Upload, e))?;

        let entry = JournalEntry {
            address: address.as_str().to_string(),
            signature: signature.to_hex(),
            cid: receipt.cid,
        };

        debug!(
            address = %address,
            cid = entry.cid.as_deref().unwrap_or("-"),
            "credential published"
        );

        // 5. Remember the acknowledged upload.
        let recorded = match &self.journal {
            Some(journal) => journal.put(&key, &entry).map_err(CredentialError::from),
            None => Ok(()),
        };
        let published = SignatureEntry {
            user: entry.address,
            signature: entry.signature,
        };
        Ok(match recorded {
            Ok(()) => AddressOutcome::Published(published),
            Err(e) => AddressOutcome::Unrecorded(published, e),
        })
    }

    fn with_retry<T>(
        &self,
        stage: Stage,
        mut op: impl FnMut() -> Result<T, CredentialError>,
    ) -> Result<T, CredentialError> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if self.config.retry.should_retry(attempt, &e) => {
                    let delay = self.config.retry.backoff(attempt);
                    warn!(
                        %stage,
                        attempt,
                        max_attempts = self.config.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying stage"
                    );
                    if let Some(m) = &self.metrics {
                        m.stage_retries.with_label_values(&[stage.as_str()]).inc();
                    }
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn abort(
    chunk: usize,
    position: usize,
    address: String,
    stage: Stage,
    source: CredentialError,
) -> PipelineError {
    let err = PipelineError::Address {
        chunk,
        position,
        address,
        stage,
        source,
    };
    error!(error = %err, "aborting run");
    err
}
