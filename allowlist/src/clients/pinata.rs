//! Pinata pinning client.
//!
//! ```json
//! POST https://api.pinata.cloud/pinning/pinJSONToIPFS
//! Authorization: Bearer <jwt>
//! { "pinataOptions": {...}, "pinataMetadata": {...}, "pinataContent": {...} }
//!
//! Response:
//! { "IpfsHash": "bafk...", "PinSize": 512, "Timestamp": "2026-10-18T00:00:00.000Z" }
//! ```

use std::fmt;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::pipeline::{PinReceipt, PinningService, UploadError};
use crate::types::PublicationRecord;

/// Default pinning endpoint.
pub const PINATA_PIN_JSON_URL: &str = "https://api.pinata.cloud/pinning/pinJSONToIPFS";

/// Blocking Pinata client authenticated with a JWT.
pub struct PinataClient {
    endpoint: String,
    jwt: String,
    client: Client,
}

impl fmt::Debug for PinataClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinataClient")
            .field("endpoint", &self.endpoint)
            .field("jwt", &"<redacted>")
            .finish()
    }
}

/// Success body; only the content id is used.
#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: Option<String>,
}

impl PinataClient {
    pub fn new(
        endpoint: impl Into<String>,
        jwt: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UploadError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.into(),
            jwt: jwt.into(),
            client,
        })
    }
}

impl PinningService for PinataClient {
    fn pin_json(&self, record: &PublicationRecord) -> Result<PinReceipt, UploadError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.jwt)
            .json(record)
            .send()
            .map_err(|e| UploadError::Transport(format!("HTTP POST {} failed: {e}", self.endpoint)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }

        // A 2xx is the acknowledgement; the body is informational.
        let cid = resp
            .json::<PinResponse>()
            .ok()
            .and_then(|body| body.ipfs_hash);
        Ok(PinReceipt { cid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_response_can_be_deserialized() {
        let json = r#"
        {
          "IpfsHash": "bafkreidvbhs33ighmljlvr7zbv2ywwzcmp5adtf4kqvlly67cy56bdtmve",
          "PinSize": 243,
          "Timestamp": "2026-10-18T09:12:44.123Z"
        }
        "#;

        let resp: PinResponse = serde_json::from_str(json).expect("PinResponse should parse");
        assert_eq!(
            resp.ipfs_hash.as_deref(),
            Some("bafkreidvbhs33ighmljlvr7zbv2ywwzcmp5adtf4kqvlly67cy56bdtmve")
        );
    }

    #[test]
    fn debug_output_hides_the_token() {
        let client = PinataClient::new(PINATA_PIN_JSON_URL, "secret-jwt", Duration::from_secs(1))
            .unwrap();
        let printed = format!("{client:?}");
        assert!(!printed.contains("secret-jwt"));
        assert!(printed.contains("pinJSONToIPFS"));
    }
}
