//! Batch pipeline: address list in, audit files and pinned credentials out.
//!
//! - [`input`]: address list parsing and chunk arithmetic,
//! - [`publisher`]: the sequential [`BatchPublisher`] state machine,
//! - [`retry`]: retry and failure policies,
//! - [`stage`]: stage names and the run-level [`PipelineError`],
//! - [`upload`]: the pinning service and audit forwarding seams.

pub mod input;
pub mod publisher;
pub mod retry;
pub mod stage;
pub mod upload;

pub use input::{chunk_count, parse_address_list, read_address_file};
pub use publisher::{
    BatchPublisher, BatchState, DEFAULT_CHUNK_SIZE, PublisherConfig, RunSummary, SkippedAddress,
};
pub use retry::{FailurePolicy, RetryPolicy};
pub use stage::{PipelineError, Stage};
pub use upload::{AuditForwarder, PinReceipt, PinningService, UploadError};
