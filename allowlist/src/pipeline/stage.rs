use std::fmt;

use crate::credential::CredentialError;

/// Steps a participant address goes through, in order, plus the two
/// chunk-level steps.
///
/// Side effects are strictly ordered: nothing is sealed before it is
/// signed, nothing is uploaded before it is sealed, nothing is recorded
/// before the upload is acknowledged.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    /// Address validation and commitment construction.
    Commit,
    /// Publication journal lookup for already-published addresses.
    Resume,
    /// Authority signature over the commitment.
    Sign,
    /// Access policy encoding.
    Policy,
    /// Local encryption plus key binding on the encryption network.
    Seal,
    /// Upload of the publication record to the pinning service.
    Upload,
    /// Journal update after an acknowledged upload.
    Record,
    /// Chunk audit file write.
    Audit,
    /// Forwarding of the chunk audit file to the signature API.
    Forward,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Commit => "commit",
            Stage::Resume => "resume",
            Stage::Sign => "sign",
            Stage::Policy => "policy",
            Stage::Seal => "seal",
            Stage::Upload => "upload",
            Stage::Record => "record",
            Stage::Audit => "audit",
            Stage::Forward => "forward",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a batch run, located by chunk and (when applicable) address.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The publisher was configured inconsistently.
    #[error("invalid publisher configuration: {0}")]
    Config(String),

    /// The address list could not be read.
    #[error("reading address list failed: {0}")]
    Input(#[source] CredentialError),

    /// Processing of a single address failed.
    #[error("chunk {chunk}, address #{position} ({address}) failed at {stage} stage: {source}")]
    Address {
        chunk: usize,
        position: usize,
        address: String,
        stage: Stage,
        #[source]
        source: CredentialError,
    },

    /// A chunk-level step failed after all addresses were processed.
    #[error("chunk {chunk} failed at {stage} stage: {source}")]
    Chunk {
        chunk: usize,
        stage: Stage,
        #[source]
        source: CredentialError,
    },
}

impl PipelineError {
    /// Underlying credential error, if any.
    pub fn credential_error(&self) -> Option<&CredentialError> {
        match self {
            PipelineError::Config(_) => None,
            PipelineError::Input(source)
            | PipelineError::Address { source, .. }
            | PipelineError::Chunk { source, .. } => Some(source),
        }
    }

    /// Stage the failure happened in, if it is tied to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Address { stage, .. } | PipelineError::Chunk { stage, .. } => {
                Some(*stage)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_error_names_chunk_position_and_stage() {
        let err = PipelineError::Address {
            chunk: 2,
            position: 3,
            address: "0xabc".to_string(),
            stage: Stage::Upload,
            source: CredentialError::UploadFailed("HTTP 502".to_string()),
        };

        let msg = err.to_string();
        assert!(msg.contains("chunk 2"), "{msg}");
        assert!(msg.contains("address #3 (0xabc)"), "{msg}");
        assert!(msg.contains("upload stage"), "{msg}");
        assert_eq!(err.stage(), Some(Stage::Upload));
        assert_eq!(err.credential_error().map(|e| e.kind()), Some("UploadFailed"));
    }
}
