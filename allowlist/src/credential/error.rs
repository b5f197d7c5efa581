use std::path::PathBuf;

use crate::types::InvalidAddress;

/// Errors produced while building, signing, sealing or publishing a
/// credential.
///
/// Every failure of the pipeline maps onto one of these variants; the
/// pipeline adds the stage and address on top (see
/// [`crate::pipeline::PipelineError`]).
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Input is not a well-formed account address.
    #[error(transparent)]
    InvalidAddress(#[from] InvalidAddress),

    /// The chain id could not be resolved to a usable network.
    #[error("missing network: {0}")]
    MissingNetwork(String),

    /// The external signer could not be reached or refused to sign.
    #[error("signing unavailable: {0}")]
    SigningUnavailable(String),

    /// The signer returned bytes that do not decompose into `(v, r, s)`.
    #[error("signature encoding error: {0}")]
    SignatureEncodingError(String),

    /// The encryption network refused the access policy.
    #[error("access policy rejected: {0}")]
    PolicyRejected(String),

    /// Submitting the key to the encryption network failed.
    #[error("encryption network error: {0}")]
    EncryptionNetworkError(String),

    /// The encryption network was used without an established session.
    #[error("encryption network not connected: {0}")]
    NotConnected(String),

    /// Publishing to the pinning service (or API) failed.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// Reading the address list or writing an audit file failed.
    #[error("file system error at {}: {source}", path.display())]
    FileSystemError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The publication journal could not be read or updated.
    #[error("publication journal error: {0}")]
    Journal(String),
}

impl CredentialError {
    /// Returns `true` for failures worth retrying with the same inputs.
    ///
    /// Only transport-level failures of external collaborators qualify;
    /// validation and encoding errors are deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CredentialError::SigningUnavailable(_)
                | CredentialError::EncryptionNetworkError(_)
                | CredentialError::UploadFailed(_)
        )
    }

    /// Short, stable name of the variant, used for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            CredentialError::InvalidAddress(_) => "InvalidAddress",
            CredentialError::MissingNetwork(_) => "MissingNetwork",
            CredentialError::SigningUnavailable(_) => "SigningUnavailable",
            CredentialError::SignatureEncodingError(_) => "SignatureEncodingError",
            CredentialError::PolicyRejected(_) => "PolicyRejected",
            CredentialError::EncryptionNetworkError(_) => "EncryptionNetworkError",
            CredentialError::NotConnected(_) => "NotConnected",
            CredentialError::UploadFailed(_) => "UploadFailed",
            CredentialError::FileSystemError { .. } => "FileSystemError",
            CredentialError::Journal(_) => "Journal",
        }
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CredentialError::FileSystemError {
            path: path.into(),
            source,
        }
    }
}
