//! JSON-RPC chain client and authority signer.
//!
//! Talks to an Ethereum node (or a signing proxy in front of one) that
//! holds the authority's unlocked account:
//!
//! ```json
//! POST <rpc_url>
//! { "jsonrpc": "2.0", "id": 1, "method": "personal_sign",
//!   "params": ["0x<message hex>", "0x<authority>"] }
//!
//! Response:
//! { "jsonrpc": "2.0", "id": 1, "result": "0x<65-byte r‖s‖v>" }
//! ```
//!
//! The private key never leaves the node.
//!
//! `eth_chainId` only yields a number; the network name reported alongside
//! it is either an explicit override or taken from [`known_chain_name`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::credential::{AuthoritySigner, ChainClient, NetworkInfo, SignerError};
use crate::types::Address;

/// JSON-RPC client bound to one authority account.
pub struct JsonRpcClient {
    url: String,
    client: Client,
    account: Address,
    network_name: Option<String>,
    next_id: AtomicU64,
}

/// Names of well-known chains, as the encryption network spells them.
const KNOWN_CHAINS: &[(u64, &str)] = &[
    (1, "ethereum"),
    (3, "ropsten"),
    (4, "rinkeby"),
    (5, "goerli"),
    (10, "optimism"),
    (42, "kovan"),
    (56, "bsc"),
    (97, "bscTestnet"),
    (100, "xdai"),
    (137, "polygon"),
    (250, "fantom"),
    (31337, "hardhat"),
    (42161, "arbitrum"),
    (43113, "fuji"),
    (43114, "avalanche"),
    (80001, "mumbai"),
    (11155111, "sepolia"),
];

/// Client-side name of `chain_id`, if it is a well-known chain.
pub fn known_chain_name(chain_id: u64) -> Option<&'static str> {
    KNOWN_CHAINS
        .iter()
        .find(|(id, _)| *id == chain_id)
        .map(|(_, name)| *name)
}

/// Request envelope.
#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

/// Error object of a failed call.
#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

impl RpcResponse {
    fn into_result<T: DeserializeOwned>(self, method: &str) -> Result<T, SignerError> {
        if let Some(err) = self.error {
            return Err(SignerError::Rejected(format!(
                "{method} failed with code {}: {}",
                err.code, err.message
            )));
        }
        let result = self
            .result
            .ok_or_else(|| SignerError::Protocol(format!("{method} returned no result")))?;
        serde_json::from_value(result)
            .map_err(|e| SignerError::Protocol(format!("{method} returned unexpected result: {e}")))
    }
}

/// Parses a `0x`-prefixed hex quantity such as `"0x64"`.
fn parse_quantity(value: &str) -> Result<u64, SignerError> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| SignerError::Protocol(format!("quantity without 0x prefix: {value:?}")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| SignerError::Protocol(format!("bad quantity {value:?}: {e}")))
}

/// Decodes `0x`-prefixed hex data.
fn parse_data(value: &str) -> Result<Vec<u8>, SignerError> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| SignerError::Protocol(format!("data without 0x prefix: {value:?}")))?;
    hex::decode(digits).map_err(|e| SignerError::Protocol(format!("bad hex data: {e}")))
}

impl JsonRpcClient {
    /// Connects to `url` and binds to `account`, or to the node's first
    /// account when none is given.
    pub fn connect(
        url: impl Into<String>,
        timeout: Duration,
        account: Option<Address>,
    ) -> Result<Self, SignerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SignerError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        let mut this = Self {
            url: url.into(),
            client,
            account: Address::from_bytes([0; 20]),
            network_name: None,
            next_id: AtomicU64::new(1),
        };

        this.account = match account {
            Some(account) => account,
            None => {
                let accounts: Vec<String> = this.call("eth_accounts", json!([]))?;
                let first = accounts
                    .first()
                    .ok_or_else(|| SignerError::Rejected("node exposes no accounts".to_string()))?;
                Address::parse(first).map_err(|e| SignerError::Protocol(e.to_string()))?
            }
        };
        debug!(url = %this.url, account = %this.account, "JSON-RPC signer ready");
        Ok(this)
    }

    /// Reports `name` as the network name regardless of the chain id.
    pub fn with_network_name(mut self, name: impl Into<String>) -> Self {
        self.network_name = Some(name.into());
        self
    }

    fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, SignerError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let resp = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .map_err(|e| SignerError::Unavailable(format!("{method} to {} failed: {e}", self.url)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SignerError::Unavailable(format!(
                "{method}: node returned HTTP status {status}"
            )));
        }

        resp.json::<RpcResponse>()
            .map_err(|e| SignerError::Protocol(format!("failed to parse JSON-RPC response: {e}")))?
            .into_result(method)
    }
}

impl ChainClient for JsonRpcClient {
    fn network(&self) -> Result<NetworkInfo, SignerError> {
        let chain_id: String = self.call("eth_chainId", json!([]))?;
        let chain_id = parse_quantity(&chain_id)?;
        let name = self
            .network_name
            .clone()
            .or_else(|| known_chain_name(chain_id).map(str::to_string));
        Ok(NetworkInfo { chain_id, name })
    }
}

impl AuthoritySigner for JsonRpcClient {
    fn address(&self) -> &Address {
        &self.account
    }

    fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        let params = json!([format!("0x{}", hex::encode(message)), self.account.as_str()]);
        let signature: String = self.call("personal_sign", params)?;
        parse_data(&signature)
    }
}
