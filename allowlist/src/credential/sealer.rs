//! Credential sealing.
//!
//! Sealing happens in two steps:
//!
//! 1. the signature hex is encrypted locally with AES-256-GCM under a fresh
//!    one-time key (no network involved), then
//! 2. the one-time key is handed to the encryption network together with the
//!    access policy; the network returns a wrapped key handle that it will
//!    only unwrap for a requester satisfying the policy.

use std::fmt;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use rand::{RngCore, rngs::OsRng};
use tracing::debug;

use crate::types::{AccessPolicy, AuthSig, AuthoritySignature, SealedCredential};

use super::error::CredentialError;

/// Length in bytes of the one-time symmetric key.
pub const KEY_LEN: usize = 32;

/// Length in bytes of the AES-GCM nonce prepended to every ciphertext.
pub const NONCE_LEN: usize = 12;

/// One-time AES-256 key. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey([u8; KEY_LEN]);

impl SymmetricKey {
    /// Draws a fresh key from the operating system RNG.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// Everything the encryption network needs to bind a key to a policy.
#[derive(Debug)]
pub struct SaveKeyRequest<'a> {
    pub policy: &'a AccessPolicy,
    pub key: &'a SymmetricKey,
    pub auth_sig: &'a AuthSig,
    pub chain: &'a str,
}

/// Errors reported by the encryption network.
#[derive(Debug, thiserror::Error)]
pub enum KeyNetworkError {
    /// `save_encryption_key` was called before `connect`.
    #[error("encryption network used before connect()")]
    NotConnected,
    /// Transport-level failure (timeout, 5xx, ...).
    #[error("encryption network unavailable: {0}")]
    Unavailable(String),
    /// The network refused the policy shape.
    #[error("{0}")]
    PolicyRejected(String),
    /// The network answered with an unexpected payload.
    #[error("unexpected encryption network response: {0}")]
    Protocol(String),
}

impl From<KeyNetworkError> for CredentialError {
    fn from(e: KeyNetworkError) -> Self {
        match e {
            KeyNetworkError::PolicyRejected(msg) => CredentialError::PolicyRejected(msg),
            other @ KeyNetworkError::NotConnected => {
                CredentialError::NotConnected(other.to_string())
            }
            other => CredentialError::EncryptionNetworkError(other.to_string()),
        }
    }
}

/// Threshold-encryption / access-control network.
///
/// The network must be connected explicitly before first use.
pub trait KeyNetwork {
    /// Establishes the session with the network.
    fn connect(&mut self) -> Result<(), KeyNetworkError>;

    /// Binds `request.key` to `request.policy` and returns the wrapped key.
    fn save_encryption_key(&self, request: &SaveKeyRequest<'_>) -> Result<Vec<u8>, KeyNetworkError>;
}

/// Encrypts `plaintext` under `key`, returning `nonce‖ciphertext‖tag`.
pub fn encrypt_payload(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, CredentialError> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CredentialError::SignatureEncodingError(format!("bad key length: {e}")))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| {
            CredentialError::SignatureEncodingError(format!("payload encryption failed: {e}"))
        })?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Inverse of [`encrypt_payload`], for whoever ends up holding the key.
pub fn decrypt_payload(key: &SymmetricKey, sealed: &[u8]) -> Result<Vec<u8>, CredentialError> {
    if sealed.len() < NONCE_LEN {
        return Err(CredentialError::SignatureEncodingError(
            "sealed payload shorter than nonce".to_string(),
        ));
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CredentialError::SignatureEncodingError(format!("bad key length: {e}")))?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| CredentialError::SignatureEncodingError(format!("payload decryption failed: {e}")))
}

/// Seals authority signatures for individual participants.
pub struct CredentialSealer<K> {
    network: K,
}

impl<K: KeyNetwork> CredentialSealer<K> {
    /// Wraps an already connected network.
    pub fn new(network: K) -> Self {
        Self { network }
    }

    /// Connects `network` and wraps it.
    pub fn connect(mut network: K) -> Result<Self, CredentialError> {
        network.connect()?;
        Ok(Self { network })
    }

    /// Returns the underlying network client.
    pub fn network(&self) -> &K {
        &self.network
    }

    /// Seals `signature` so that only a requester satisfying `policy` on
    /// `chain` can recover it.
    pub fn seal(
        &self,
        signature: &AuthoritySignature,
        policy: &AccessPolicy,
        auth_sig: &AuthSig,
        chain: &str,
    ) -> Result<SealedCredential, CredentialError> {
        let key = SymmetricKey::generate();
        let ciphertext = encrypt_payload(&key, signature.to_hex().as_bytes())?;

        let wrapped_key = self.network.save_encryption_key(&SaveKeyRequest {
            policy,
            key: &key,
            auth_sig,
            chain,
        })?;

        debug!(
            chain,
            ciphertext_len = ciphertext.len(),
            wrapped_key_len = wrapped_key.len(),
            "credential sealed"
        );

        Ok(SealedCredential {
            ciphertext,
            wrapped_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::policy::encode_policy;
    use crate::test_support::{FakeKeyNetwork, dummy_auth_sig};
    use crate::types::{Address, HASH_LEN};

    fn signature() -> AuthoritySignature {
        AuthoritySignature {
            v: 27,
            r: [0x33; HASH_LEN],
            s: [0x44; HASH_LEN],
        }
    }

    fn participant() -> Address {
        Address::parse("0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359").unwrap()
    }

    #[test]
    fn payload_roundtrips_under_the_same_key() {
        let key = SymmetricKey::generate();
        let sealed = encrypt_payload(&key, b"0x1b33").unwrap();

        assert_eq!(sealed.len(), NONCE_LEN + 6 + 16);
        assert_eq!(decrypt_payload(&key, &sealed).unwrap(), b"0x1b33");
        assert!(decrypt_payload(&SymmetricKey::generate(), &sealed).is_err());
    }

    #[test]
    fn fresh_key_and_nonce_per_seal() {
        let network = FakeKeyNetwork::connected();
        let sealer = CredentialSealer::new(network);
        let policy = encode_policy(&participant(), "xdai").unwrap();
        let auth = dummy_auth_sig();

        let a = sealer.seal(&signature(), &policy, &auth, "xdai").unwrap();
        let b = sealer.seal(&signature(), &policy, &auth, "xdai").unwrap();

        assert_ne!(a.ciphertext, b.ciphertext);
        assert_ne!(a.wrapped_key, b.wrapped_key);
    }

    #[test]
    fn sealed_signature_is_recoverable_by_the_policy_holder() {
        let sealer = CredentialSealer::new(FakeKeyNetwork::connected());
        let policy = encode_policy(&participant(), "xdai").unwrap();

        let sealed = sealer
            .seal(&signature(), &policy, &dummy_auth_sig(), "xdai")
            .unwrap();

        let key = sealer
            .network()
            .unwrap_for(&sealed.wrapped_key, participant().as_str())
            .expect("policy holder can unwrap");
        let plaintext = decrypt_payload(&key, &sealed.ciphertext).unwrap();
        assert_eq!(plaintext, signature().to_hex().into_bytes());

        let other = "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB";
        assert!(sealer.network().unwrap_for(&sealed.wrapped_key, other).is_none());
    }

    #[test]
    fn network_receives_policy_auth_sig_and_chain() {
        let sealer = CredentialSealer::new(FakeKeyNetwork::connected());
        let policy = encode_policy(&participant(), "polygon").unwrap();
        let auth = dummy_auth_sig();

        sealer.seal(&signature(), &policy, &auth, "polygon").unwrap();

        let calls = sealer.network().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].policy, policy);
        assert_eq!(calls[0].auth_sig, auth);
        assert_eq!(calls[0].chain, "polygon");
    }

    #[test]
    fn unconnected_network_is_not_retryable() {
        let sealer = CredentialSealer::new(FakeKeyNetwork::default());
        let policy = encode_policy(&participant(), "xdai").unwrap();

        let err = sealer
            .seal(&signature(), &policy, &dummy_auth_sig(), "xdai")
            .unwrap_err();
        assert!(matches!(err, CredentialError::NotConnected(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn connect_establishes_the_session() {
        let sealer = CredentialSealer::connect(FakeKeyNetwork::default()).unwrap();
        let policy = encode_policy(&participant(), "xdai").unwrap();
        assert!(
            sealer
                .seal(&signature(), &policy, &dummy_auth_sig(), "xdai")
                .is_ok()
        );
    }

    #[test]
    fn policy_rejection_is_not_retryable() {
        let sealer = CredentialSealer::new(FakeKeyNetwork::rejecting_policies());
        let policy = encode_policy(&participant(), "xdai").unwrap();

        let err = sealer
            .seal(&signature(), &policy, &dummy_auth_sig(), "xdai")
            .unwrap_err();
        assert!(matches!(err, CredentialError::PolicyRejected(_)));
        assert!(!err.is_retryable());
    }
}
