//! Signature API client.
//!
//! Forwards finished chunk audit files to the auction backend:
//!
//! ```json
//! POST <api_url>/api/v1/provide_signature
//! { "auctionId": 7, "chainId": 100, "allowListContract": "0x...",
//!   "signatures": [{ "user": "0x...", "signature": "0x..." }] }
//! ```

use std::time::Duration;

use reqwest::blocking::Client;

use crate::pipeline::{AuditForwarder, UploadError};
use crate::types::ChunkAuditFile;

use super::join_url;

/// Path of the signature endpoint below the API root.
pub const PROVIDE_SIGNATURE_PATH: &str = "/api/v1/provide_signature";

/// Blocking client for the signature API.
pub struct SignatureApiClient {
    base_url: String,
    client: Client,
}

impl SignatureApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UploadError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> String {
        join_url(&self.base_url, PROVIDE_SIGNATURE_PATH)
    }
}

impl AuditForwarder for SignatureApiClient {
    fn forward(&self, audit: &ChunkAuditFile) -> Result<(), UploadError> {
        let url = self.endpoint();
        let resp = self
            .client
            .post(&url)
            .json(audit)
            .send()
            .map_err(|e| UploadError::Transport(format!("HTTP POST {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }
        Ok(())
    }
}
