//! HTTP gateway client for the encryption network.
//!
//! The gateway fronts the threshold network and exposes two calls:
//!
//! ```json
//! POST <base>/handshake
//! { "client": "allowlist", "version": "0.1.0" }
//! → { "session": "..." }
//!
//! POST <base>/store_encryption_condition
//! { "session": "...", "accessControlConditions": [...], "symmetricKey": "<hex>",
//!   "authSig": {...}, "chain": "xdai", "permanent": true }
//! → { "encryptedSymmetricKey": "<hex>" }
//! ```
//!
//! 400 and 422 answers mean the gateway refused the condition; anything else
//! that is not 2xx is treated as the network being unavailable.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::credential::{KeyNetwork, KeyNetworkError, SaveKeyRequest};
use crate::types::{AccessPolicy, AuthSig};

use super::join_url;

/// Blocking client for the encryption network gateway.
pub struct HttpKeyNetwork {
    base_url: String,
    client: Client,
    session: Option<String>,
}

#[derive(Debug, Serialize)]
struct HandshakeRequest {
    client: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
struct HandshakeResponse {
    session: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreConditionRequest<'a> {
    session: &'a str,
    access_control_conditions: &'a AccessPolicy,
    symmetric_key: String,
    auth_sig: &'a AuthSig,
    chain: &'a str,
    permanent: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreConditionResponse {
    encrypted_symmetric_key: String,
}

impl HttpKeyNetwork {
    /// `base_url` is the gateway root, e.g. `"https://gateway.example/v1"`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, KeyNetworkError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeyNetworkError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            client,
            session: None,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

fn status_error(status: StatusCode, body: String) -> KeyNetworkError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            KeyNetworkError::PolicyRejected(format!("gateway refused condition ({status}): {body}"))
        }
        _ => KeyNetworkError::Unavailable(format!("gateway returned HTTP status {status}: {body}")),
    }
}

fn decode_wrapped_key(response: StoreConditionResponse) -> Result<Vec<u8>, KeyNetworkError> {
    let digits = response
        .encrypted_symmetric_key
        .trim_start_matches("0x");
    hex::decode(digits)
        .map_err(|e| KeyNetworkError::Protocol(format!("wrapped key is not hex: {e}")))
}

impl KeyNetwork for HttpKeyNetwork {
    fn connect(&mut self) -> Result<(), KeyNetworkError> {
        let url = join_url(&self.base_url, "/handshake");
        let resp = self
            .client
            .post(&url)
            .json(&HandshakeRequest {
                client: "allowlist",
                version: env!("CARGO_PKG_VERSION"),
            })
            .send()
            .map_err(|e| KeyNetworkError::Unavailable(format!("HTTP POST {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(KeyNetworkError::Unavailable(format!(
                "handshake returned HTTP status {status}"
            )));
        }

        let body = resp
            .json::<HandshakeResponse>()
            .map_err(|e| KeyNetworkError::Protocol(format!("failed to parse handshake: {e}")))?;
        self.session = Some(body.session);
        info!(gateway = %self.base_url, "connected to encryption network");
        Ok(())
    }

    fn save_encryption_key(&self, request: &SaveKeyRequest<'_>) -> Result<Vec<u8>, KeyNetworkError> {
        let session = self.session.as_deref().ok_or(KeyNetworkError::NotConnected)?;
        let url = join_url(&self.base_url, "/store_encryption_condition");

        let body = StoreConditionRequest {
            session,
            access_control_conditions: request.policy,
            symmetric_key: hex::encode(request.key.as_bytes()),
            auth_sig: request.auth_sig,
            chain: request.chain,
            permanent: true,
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| KeyNetworkError::Unavailable(format!("HTTP POST {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status, resp.text().unwrap_or_default()));
        }

        let parsed = resp
            .json::<StoreConditionResponse>()
            .map_err(|e| KeyNetworkError::Protocol(format!("failed to parse JSON response: {e}")))?;
        decode_wrapped_key(parsed)
    }
}
