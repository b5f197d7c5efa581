//! Deterministic fakes for the external collaborators of the pipeline.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};

use crate::credential::signer::personal_message_digest;
use crate::credential::{
    AuthoritySigner, ChainClient, KeyNetwork, KeyNetworkError, NetworkInfo, SaveKeyRequest,
    SignerError, SymmetricKey,
};
use crate::pipeline::{AuditForwarder, PinReceipt, PinningService, UploadError};
use crate::types::{
    AccessPolicy, Address, AuthSig, AuthoritySignature, ChunkAuditFile, HASH_LEN, Hash256,
    PublicationRecord,
};

/// Call indices (0-based) at which a fake fails.
#[derive(Clone, Debug, Default)]
struct FailurePlan {
    failing: BTreeSet<usize>,
    calls: Cell<usize>,
}

impl FailurePlan {
    /// Counts a call and reports whether it must fail.
    fn next_fails(&self) -> bool {
        let index = self.calls.get();
        self.calls.set(index + 1);
        self.failing.contains(&index)
    }
}

/// In-process secp256k1 personal-message signer.
pub struct LocalKeySigner {
    key: SigningKey,
    address: Address,
    signatures: Cell<usize>,
}

impl LocalKeySigner {
    /// Signer with the private key `[seed; 32]`.
    pub fn from_seed(seed: u8) -> Self {
        let key = SigningKey::from_slice(&[seed; 32]).expect("valid secp256k1 scalar");
        let address = address_of(key.verifying_key());
        Self {
            key,
            address,
            signatures: Cell::new(0),
        }
    }

    /// Number of messages signed so far.
    pub fn sign_count(&self) -> usize {
        self.signatures.get()
    }

    /// Recovers the signer of an [`AuthoritySignature`] over `message`.
    pub fn recover(&self, message: &[u8; HASH_LEN], signature: &AuthoritySignature) -> Address {
        let mut raw = Vec::with_capacity(65);
        raw.extend_from_slice(&signature.r);
        raw.extend_from_slice(&signature.s);
        raw.push(signature.v);
        let digest = personal_message_digest(message);
        self.recover_digest(digest.as_bytes(), &raw)
    }

    /// Recovers the signer of a raw `r‖s‖v` signature over `digest`.
    pub fn recover_digest(&self, digest: &[u8; HASH_LEN], raw: &[u8]) -> Address {
        let signature = Signature::from_slice(&raw[..64]).expect("r‖s");
        let v = raw[64];
        let recovery_id = RecoveryId::from_byte(if v >= 27 { v - 27 } else { v }).expect("v");
        let key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
            .expect("recoverable signature");
        address_of(&key)
    }
}

fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = Hash256::keccak256(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(bytes)
}

impl AuthoritySigner for LocalKeySigner {
    fn address(&self) -> &Address {
        &self.address
    }

    fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        let digest = personal_message_digest(message);
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest.as_bytes())
            .map_err(|e| SignerError::Protocol(e.to_string()))?;
        self.signatures.set(self.signatures.get() + 1);

        let mut raw = signature.to_bytes().to_vec();
        raw.push(recovery_id.to_byte() + 27);
        Ok(raw)
    }
}

/// Signer whose endpoint is down.
pub struct FailingSigner {
    address: Address,
}

impl Default for FailingSigner {
    fn default() -> Self {
        Self {
            address: Address::from_bytes([0x42; 20]),
        }
    }
}

impl AuthoritySigner for FailingSigner {
    fn address(&self) -> &Address {
        &self.address
    }

    fn sign_message(&self, _message: &[u8]) -> Result<Vec<u8>, SignerError> {
        Err(SignerError::Unavailable("connection refused".to_string()))
    }
}

/// Chain client reporting a fixed network.
pub struct FakeChain {
    info: Option<NetworkInfo>,
}

impl FakeChain {
    pub fn new(chain_id: u64, name: Option<&str>) -> Self {
        Self {
            info: Some(NetworkInfo {
                chain_id,
                name: name.map(str::to_string),
            }),
        }
    }

    pub fn unreachable() -> Self {
        Self { info: None }
    }
}

impl ChainClient for FakeChain {
    fn network(&self) -> Result<NetworkInfo, SignerError> {
        self.info
            .clone()
            .ok_or_else(|| SignerError::Unavailable("connection refused".to_string()))
    }
}

/// What the fake encryption network was asked to do.
#[derive(Clone, Debug, PartialEq)]
pub struct SaveCall {
    pub policy: AccessPolicy,
    pub auth_sig: AuthSig,
    pub chain: String,
}

/// Encryption network that keeps the keys it was given and only hands them
/// back to the address bound by the policy.
#[derive(Default)]
pub struct FakeKeyNetwork {
    connected: bool,
    reject_policies: bool,
    failures: FailurePlan,
    calls: RefCell<Vec<SaveCall>>,
    keys: RefCell<HashMap<Vec<u8>, (String, SymmetricKey)>>,
}

impl FakeKeyNetwork {
    pub fn connected() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    pub fn rejecting_policies() -> Self {
        Self {
            connected: true,
            reject_policies: true,
            ..Self::default()
        }
    }

    /// Makes the given save calls (0-based) fail with a transport error.
    pub fn failing_on(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.failures.failing.extend(calls);
        self
    }

    /// Successful save calls, in order.
    pub fn calls(&self) -> Vec<SaveCall> {
        self.calls.borrow().clone()
    }

    /// Unwraps `wrapped` for `requester`, if the policy allows it.
    pub fn unwrap_for(&self, wrapped: &[u8], requester: &str) -> Option<SymmetricKey> {
        let keys = self.keys.borrow();
        let (bound, key) = keys.get(wrapped)?;
        bound.eq_ignore_ascii_case(requester).then(|| key.clone())
    }
}

impl KeyNetwork for FakeKeyNetwork {
    fn connect(&mut self) -> Result<(), KeyNetworkError> {
        self.connected = true;
        Ok(())
    }

    fn save_encryption_key(&self, request: &SaveKeyRequest<'_>) -> Result<Vec<u8>, KeyNetworkError> {
        if !self.connected {
            return Err(KeyNetworkError::NotConnected);
        }
        if self.failures.next_fails() {
            return Err(KeyNetworkError::Unavailable("gateway timeout".to_string()));
        }
        if self.reject_policies {
            return Err(KeyNetworkError::PolicyRejected("unsupported condition".to_string()));
        }
        let bound = request
            .policy
            .bound_address()
            .ok_or_else(|| KeyNetworkError::PolicyRejected("no address clause".to_string()))?
            .to_string();

        let mut calls = self.calls.borrow_mut();
        let wrapped = format!("wrapped-key-{}", calls.len()).into_bytes();
        calls.push(SaveCall {
            policy: request.policy.clone(),
            auth_sig: request.auth_sig.clone(),
            chain: request.chain.to_string(),
        });
        self.keys
            .borrow_mut()
            .insert(wrapped.clone(), (bound, request.key.clone()));
        Ok(wrapped)
    }
}

/// Pinning service that records every acknowledged upload.
#[derive(Default)]
pub struct RecordingPinner {
    failures: FailurePlan,
    pinned: RefCell<Vec<PublicationRecord>>,
}

impl RecordingPinner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the given upload calls (0-based) fail with HTTP 502.
    pub fn failing_on(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.failures.failing.extend(calls);
        self
    }

    pub fn pinned(&self) -> Vec<PublicationRecord> {
        self.pinned.borrow().clone()
    }
}

impl PinningService for RecordingPinner {
    fn pin_json(&self, record: &PublicationRecord) -> Result<PinReceipt, UploadError> {
        if self.failures.next_fails() {
            return Err(UploadError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        let mut pinned = self.pinned.borrow_mut();
        pinned.push(record.clone());
        Ok(PinReceipt {
            cid: Some(format!("bafytest{}", pinned.len())),
        })
    }
}

/// Audit forwarder sharing its log with every clone.
#[derive(Clone, Default)]
pub struct RecordingForwarder {
    fail: bool,
    forwarded: Rc<RefCell<Vec<ChunkAuditFile>>>,
}

impl RecordingForwarder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn forwarded(&self) -> Vec<ChunkAuditFile> {
        self.forwarded.borrow().clone()
    }
}

impl AuditForwarder for RecordingForwarder {
    fn forward(&self, audit: &ChunkAuditFile) -> Result<(), UploadError> {
        if self.fail {
            return Err(UploadError::Transport("connection reset".to_string()));
        }
        self.forwarded.borrow_mut().push(audit.clone());
        Ok(())
    }
}

/// Fixed authentication assertion for components that only pass it along.
pub fn dummy_auth_sig() -> AuthSig {
    AuthSig {
        sig: format!("0x{}1b", "11".repeat(64)),
        derived_via: "web3.eth.personal.sign".to_string(),
        signed_message: "gnosis-auct wants you to sign in with your Ethereum account".to_string(),
        address: "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_string(),
    }
}
