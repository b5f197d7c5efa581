//! Network identity and the run-wide authentication assertion.
//!
//! Two things are resolved once per run and then reused unmodified:
//!
//! - the [`NetworkIdentity`] (chain id plus the network name the encryption
//!   network understands), and
//! - the [`AuthSig`], a Sign-In with Ethereum message signed by the
//!   authority that authenticates its requests to the encryption network.
//!
//! There is no expiry or refresh; a run is short enough for one assertion.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use rand::{Rng, distributions::Alphanumeric};
use tracing::info;

use crate::types::AuthSig;

use super::error::CredentialError;
use super::signer::{AuthoritySigner, SignerError, decompose_signature};

/// Origin the authentication assertion is issued for.
pub const DEFAULT_ORIGIN: &str = "https://gnosis-auction.com";

/// Domain line of the authentication assertion.
pub const DEFAULT_SIWE_DOMAIN: &str = "gnosis-auct";

/// `derivedVia` marker the encryption network expects for personal signatures.
pub const AUTH_SIG_DERIVED_VIA: &str = "web3.eth.personal.sign";

/// Static chain id → network name mapping.
///
/// Names are the ones the encryption network uses for its `chain` field,
/// which differ from what node clients report (e.g. `xdai` for chain 100).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkTable {
    names: BTreeMap<u64, String>,
}

impl Default for NetworkTable {
    fn default() -> Self {
        Self::empty()
            .with(1, "ethereum")
            .with(5, "goerli")
            .with(100, "xdai")
            .with(137, "polygon")
    }
}

impl NetworkTable {
    /// Table without any entry; every lookup falls back to the client name.
    pub fn empty() -> Self {
        Self {
            names: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) a mapping, builder style.
    pub fn with(mut self, chain_id: u64, name: impl Into<String>) -> Self {
        self.insert(chain_id, name);
        self
    }

    pub fn insert(&mut self, chain_id: u64, name: impl Into<String>) {
        self.names.insert(chain_id, name.into());
    }

    pub fn get(&self, chain_id: u64) -> Option<&str> {
        self.names.get(&chain_id).map(String::as_str)
    }

    /// Resolves `chain_id` to a network name.
    ///
    /// Mapped ids win; otherwise the name reported by the network client is
    /// used, unless it is empty or `"unknown"`.
    pub fn resolve(&self, chain_id: u64, reported: Option<&str>) -> Result<String, CredentialError> {
        if let Some(name) = self.get(chain_id) {
            return Ok(name.to_string());
        }

        match reported.map(str::trim) {
            Some(name) if !name.is_empty() && name != "unknown" => Ok(name.to_string()),
            _ => Err(CredentialError::MissingNetwork(format!(
                "chain id {chain_id} has no known network name"
            ))),
        }
    }
}

/// Injectable identity configuration.
#[derive(Clone, Debug)]
pub struct IdentityConfig {
    /// EIP-712 domain name of the allow-list contract.
    pub domain_name: String,
    /// EIP-712 domain version of the allow-list contract.
    pub domain_version: String,
    /// Domain line of the authentication assertion.
    pub siwe_domain: String,
    /// URI of the authentication assertion.
    pub origin: String,
    /// Statement prefix; the auction id is appended.
    pub statement_prefix: String,
    /// Chain id → network name table.
    pub networks: NetworkTable,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            domain_name: "AccessManager".to_string(),
            domain_version: "v1".to_string(),
            siwe_domain: DEFAULT_SIWE_DOMAIN.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            statement_prefix: "Gnosis Auction".to_string(),
            networks: NetworkTable::default(),
        }
    }
}

/// What the chain client reports about the active network.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkInfo {
    pub chain_id: u64,
    /// Client-side network name, if the client knows one.
    pub name: Option<String>,
}

/// Read-only view of the blockchain client.
pub trait ChainClient {
    fn network(&self) -> Result<NetworkInfo, SignerError>;
}

impl<T: ChainClient + ?Sized> ChainClient for &T {
    fn network(&self) -> Result<NetworkInfo, SignerError> {
        (**self).network()
    }
}

/// Resolved network of the run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkIdentity {
    pub chain_id: u64,
    pub name: String,
}

/// EIP-4361 (Sign-In with Ethereum) message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SiweMessage {
    pub domain: String,
    /// Checksummed address of the signer.
    pub address: String,
    pub statement: String,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce: String,
    /// RFC 3339 timestamp.
    pub issued_at: String,
}

impl SiweMessage {
    /// Renders the message in the exact text layout signers and verifiers
    /// agree on.
    pub fn prepare(&self) -> String {
        format!(
            "{domain} wants you to sign in with your Ethereum account:\n\
             {address}\n\
             \n\
             {statement}\n\
             \n\
             URI: {uri}\n\
             Version: {version}\n\
             Chain ID: {chain_id}\n\
             Nonce: {nonce}\n\
             Issued At: {issued_at}",
            domain = self.domain,
            address = self.address,
            statement = self.statement,
            uri = self.uri,
            version = self.version,
            chain_id = self.chain_id,
            nonce = self.nonce,
            issued_at = self.issued_at,
        )
    }
}

/// Random alphanumeric nonce for the authentication assertion.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// Run-wide identity: resolved network plus the bearer [`AuthSig`].
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub network: NetworkIdentity,
    pub auth_sig: AuthSig,
}

impl AuthContext {
    /// Resolves the network and has the authority sign a fresh assertion.
    pub fn establish<C, S>(
        client: &C,
        signer: &S,
        config: &IdentityConfig,
        auction_id: u64,
    ) -> Result<Self, CredentialError>
    where
        C: ChainClient + ?Sized,
        S: AuthoritySigner + ?Sized,
    {
        let network = resolve_network(client, &config.networks)?;
        let message = SiweMessage {
            domain: config.siwe_domain.clone(),
            address: signer.address().to_checksum(),
            statement: format!("{} {}", config.statement_prefix, auction_id),
            uri: config.origin.clone(),
            version: "1".to_string(),
            chain_id: network.chain_id,
            nonce: generate_nonce(),
            issued_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let auth_sig = sign_auth_message(signer, &message)?;

        info!(
            chain_id = network.chain_id,
            network = %network.name,
            authority = %auth_sig.address,
            "authentication assertion issued"
        );

        Ok(Self { network, auth_sig })
    }
}

/// Asks the chain client for the active network and names it.
pub fn resolve_network<C>(client: &C, table: &NetworkTable) -> Result<NetworkIdentity, CredentialError>
where
    C: ChainClient + ?Sized,
{
    let info = client
        .network()
        .map_err(|e| CredentialError::MissingNetwork(e.to_string()))?;
    let name = table.resolve(info.chain_id, info.name.as_deref())?;

    Ok(NetworkIdentity {
        chain_id: info.chain_id,
        name,
    })
}

/// Signs a prepared assertion with the authority's personal-message key.
pub fn sign_auth_message<S>(signer: &S, message: &SiweMessage) -> Result<AuthSig, CredentialError>
where
    S: AuthoritySigner + ?Sized,
{
    let signed_message = message.prepare();
    let raw = signer.sign_message(signed_message.as_bytes())?;
    decompose_signature(&raw)?;

    Ok(AuthSig {
        sig: format!("0x{}", hex::encode(&raw)),
        derived_via: AUTH_SIG_DERIVED_VIA.to_string(),
        signed_message,
        address: signer.address().to_checksum(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::signer::personal_message_digest;
    use crate::test_support::{FakeChain, LocalKeySigner};

    #[test]
    fn known_chain_ids_use_table_names() {
        let table = NetworkTable::default();
        assert_eq!(table.resolve(1, Some("homestead")).unwrap(), "ethereum");
        assert_eq!(table.resolve(5, None).unwrap(), "goerli");
        assert_eq!(table.resolve(100, Some("unknown")).unwrap(), "xdai");
        assert_eq!(table.resolve(137, None).unwrap(), "polygon");
    }

    #[test]
    fn unmapped_chain_ids_fall_back_to_reported_name() {
        let table = NetworkTable::default();
        assert_eq!(table.resolve(31337, Some("hardhat")).unwrap(), "hardhat");

        for reported in [None, Some(""), Some("unknown")] {
            let err = table.resolve(31337, reported).unwrap_err();
            assert!(matches!(err, CredentialError::MissingNetwork(_)));
        }
    }

    #[test]
    fn injected_table_overrides_defaults() {
        let table = NetworkTable::empty().with(100, "gnosis");
        assert_eq!(table.resolve(100, None).unwrap(), "gnosis");
        assert!(table.resolve(1, None).is_err());
    }

    #[test]
    fn siwe_message_layout() {
        let message = SiweMessage {
            domain: "gnosis-auct".to_string(),
            address: "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_string(),
            statement: "Gnosis Auction 7".to_string(),
            uri: "https://gnosis-auction.com".to_string(),
            version: "1".to_string(),
            chain_id: 100,
            nonce: "abcdef0123456789".to_string(),
            issued_at: "2026-10-18T00:00:00.000Z".to_string(),
        };

        let expected = "gnosis-auct wants you to sign in with your Ethereum account:\n\
                        0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed\n\
                        \n\
                        Gnosis Auction 7\n\
                        \n\
                        URI: https://gnosis-auction.com\n\
                        Version: 1\n\
                        Chain ID: 100\n\
                        Nonce: abcdef0123456789\n\
                        Issued At: 2026-10-18T00:00:00.000Z";
        assert_eq!(message.prepare(), expected);
    }

    #[test]
    fn nonces_are_alphanumeric_and_fresh() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn establish_signs_statement_with_auction_id() {
        let signer = LocalKeySigner::from_seed(3);
        let chain = FakeChain::new(100, None);

        let ctx = AuthContext::establish(&chain, &signer, &IdentityConfig::default(), 42).unwrap();

        assert_eq!(ctx.network, NetworkIdentity { chain_id: 100, name: "xdai".to_string() });
        assert_eq!(ctx.auth_sig.derived_via, AUTH_SIG_DERIVED_VIA);
        assert_eq!(ctx.auth_sig.address, signer.address().to_checksum());
        assert!(ctx.auth_sig.signed_message.contains("\nGnosis Auction 42\n"));
        assert!(ctx.auth_sig.signed_message.contains("Chain ID: 100"));
        assert!(ctx.auth_sig.signed_message.starts_with("gnosis-auct wants you"));

        let raw = hex::decode(ctx.auth_sig.sig.trim_start_matches("0x")).unwrap();
        let digest = personal_message_digest(ctx.auth_sig.signed_message.as_bytes());
        assert_eq!(signer.recover_digest(digest.as_bytes(), &raw), *signer.address());
    }

    #[test]
    fn unresolvable_network_fails_before_signing() {
        let signer = LocalKeySigner::from_seed(3);
        let chain = FakeChain::new(31337, None);

        let err = AuthContext::establish(&chain, &signer, &IdentityConfig::default(), 1).unwrap_err();
        assert!(matches!(err, CredentialError::MissingNetwork(_)));
        assert_eq!(signer.sign_count(), 0);
    }

    #[test]
    fn unreachable_chain_client_is_missing_network() {
        let signer = LocalKeySigner::from_seed(3);
        let err = AuthContext::establish(&FakeChain::unreachable(), &signer, &IdentityConfig::default(), 1)
            .unwrap_err();
        assert!(matches!(err, CredentialError::MissingNetwork(_)));
    }
}
