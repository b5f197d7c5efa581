//! Core domain types used by the credential pipeline.
//!
//! This module defines strongly-typed digests, account addresses and the
//! auction reference that every credential is bound to. The goal is to avoid
//! "naked" byte buffers and strings in public APIs and instead use
//! domain-specific newtypes.

use std::fmt;

use serde::{Deserialize, Serialize};
use tiny_keccak::{Hasher, Keccak};

/// Credential payloads: signatures, sealed credentials, audit records.
pub mod credential;
/// Access-control predicates evaluated by the encryption network.
pub mod policy;

pub use credential::{
    AuthSig, AuthoritySignature, ChunkAuditFile, PinContent, PinKeyValues, PinMetadata,
    PinOptions, PublicationRecord, SIGNATURE_LEN, SealedCredential, SignatureEntry,
};
pub use policy::{AccessCondition, AccessPolicy, ReturnValueTest};

/// Length in bytes of all 256-bit digest types used in this module.
pub const HASH_LEN: usize = 32;

/// Length in bytes of an account address.
pub const ADDRESS_LEN: usize = 20;

/// Strongly-typed 256-bit digest wrapper (Keccak-256).
///
/// This is the hash function the on-chain verifier uses, so every digest
/// that ends up being signed or compared on-chain goes through it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// Computes the Keccak-256 hash of `data`.
    pub fn keccak256(data: &[u8]) -> Self {
        Self::keccak256_chunks([data])
    }

    /// Computes the Keccak-256 hash of the concatenation of `chunks`.
    ///
    /// Equivalent to hashing the concatenated bytes, without allocating the
    /// concatenation.
    pub fn keccak256_chunks<I, T>(chunks: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut hasher = Keccak::v256();
        for chunk in chunks {
            hasher.update(chunk.as_ref());
        }
        let mut output = [0u8; HASH_LEN];
        hasher.finalize(&mut output);
        Hash256(output)
    }

    /// Returns the underlying 32-byte digest as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Returns the `0x`-prefixed lowercase hex form of the digest.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

/// Domain-separated digest binding an auction id and a participant address.
///
/// A commitment is never stored; it is recomputed from the
/// [`AuctionRef`] and the address whenever it is needed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Commitment(pub Hash256);

impl Commitment {
    /// Returns the raw digest bytes, which is exactly what gets signed.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        self.0.as_bytes()
    }
}

/// Error returned when a string is not a well-formed account address.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("invalid address {input:?}: {reason}")]
pub struct InvalidAddress {
    /// The (trimmed) input that failed validation.
    pub input: String,
    /// Short description of the violated rule.
    pub reason: &'static str,
}

/// A validated 20-byte account address.
///
/// The parsed bytes define identity (equality and hashing); the trimmed
/// input text is kept so that policies, publication metadata and audit
/// files name the participant exactly as the operator supplied it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    bytes: [u8; ADDRESS_LEN],
    text: String,
}

impl Address {
    /// Parses and validates an address of the form `0x` + 40 hex digits.
    ///
    /// Surrounding whitespace is ignored. Mixed-case input must carry a
    /// valid EIP-55 checksum; all-lowercase and all-uppercase input is
    /// accepted as-is.
    pub fn parse(input: &str) -> Result<Self, InvalidAddress> {
        let text = input.trim();
        let invalid = |reason| InvalidAddress {
            input: text.to_string(),
            reason,
        };

        let digits = text
            .strip_prefix("0x")
            .ok_or_else(|| invalid("missing 0x prefix"))?;
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(invalid("expected 40 hex digits"));
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| invalid("non-hex character"))?;

        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && checksum_digits(&bytes) != digits {
            return Err(invalid("bad EIP-55 checksum"));
        }

        Ok(Self {
            bytes,
            text: text.to_string(),
        })
    }

    /// Builds an address from raw bytes; the text form is the checksummed one.
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        let text = format!("0x{}", checksum_digits(&bytes));
        Self { bytes, text }
    }

    /// Returns the raw 20 address bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.bytes
    }

    /// Returns the address text exactly as supplied (trimmed).
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the EIP-55 checksummed representation.
    pub fn to_checksum(&self) -> String {
        format!("0x{}", checksum_digits(&self.bytes))
    }
}

/// EIP-55: uppercase every hex letter whose matching nibble of
/// `keccak256(lowercase_hex)` is >= 8.
fn checksum_digits(bytes: &[u8; ADDRESS_LEN]) -> String {
    let lower = hex::encode(bytes);
    let hash = Hash256::keccak256(lower.as_bytes());

    lower
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let byte = hash.0[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Address {}

impl std::hash::Hash for Address {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl TryFrom<String> for Address {
    type Error = InvalidAddress;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.text
    }
}

/// Immutable reference to the auction a run produces credentials for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuctionRef {
    /// Auction identifier on the auction contract.
    pub auction_id: u64,
    /// Chain id of the network the allow-list contract lives on.
    pub chain_id: u64,
    /// Address of the off-chain-managed allow-list contract.
    pub allow_list_contract: Address,
}
