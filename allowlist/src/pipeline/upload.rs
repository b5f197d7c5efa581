//! Outbound publication seams: the pinning service and the signature API.

use serde::{Deserialize, Serialize};

use crate::credential::CredentialError;
use crate::types::{ChunkAuditFile, PublicationRecord};

/// Errors reported by an upload destination.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Transport-level failure (connection refused, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),
    /// The destination answered with a non-2xx status.
    #[error("service returned HTTP status {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<UploadError> for CredentialError {
    fn from(e: UploadError) -> Self {
        CredentialError::UploadFailed(e.to_string())
    }
}

/// Acknowledgement of a pinned record.
///
/// Only the 2xx status is part of the service contract; the content id is
/// kept when the service reports one.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PinReceipt {
    pub cid: Option<String>,
}

/// Content-addressed pinning service.
///
/// Deduplication by content hash is the service's business, not ours.
pub trait PinningService {
    fn pin_json(&self, record: &PublicationRecord) -> Result<PinReceipt, UploadError>;
}

/// Alternate destination for finished chunk audit files.
pub trait AuditForwarder {
    fn forward(&self, audit: &ChunkAuditFile) -> Result<(), UploadError>;
}
