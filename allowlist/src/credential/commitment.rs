//! Commitment construction.
//!
//! A commitment is the digest the authority signs for one participant:
//!
//! ```text
//! domain     = keccak256(abi.encode(DOMAIN_TYPEHASH, keccak256(name),
//!                                   keccak256(version), chainId, contract))
//! commitment = keccak256(abi.encode(bytes32 domain, address participant,
//!                                   uint256 auctionId))
//! ```
//!
//! which is exactly what the allow-list contract recomputes on-chain before
//! recovering the signer.

use crate::types::{Address, AuctionRef, Commitment, HASH_LEN, Hash256};

use super::error::CredentialError;
use super::identity::IdentityConfig;

/// Type string of the EIP-712 domain used by the allow-list contract.
pub const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// EIP-712 domain of the allow-list contract.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContractDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl ContractDomain {
    /// Builds the domain of `auction`'s allow-list contract.
    pub fn for_auction(auction: &AuctionRef, identity: &IdentityConfig) -> Self {
        Self {
            name: identity.domain_name.clone(),
            version: identity.domain_version.clone(),
            chain_id: auction.chain_id,
            verifying_contract: auction.allow_list_contract.clone(),
        }
    }

    /// Computes the EIP-712 domain separator.
    pub fn separator(&self) -> Hash256 {
        let type_hash = Hash256::keccak256(DOMAIN_TYPE.as_bytes());
        let name_hash = Hash256::keccak256(self.name.as_bytes());
        let version_hash = Hash256::keccak256(self.version.as_bytes());

        Hash256::keccak256_chunks([
            type_hash.0,
            name_hash.0,
            version_hash.0,
            abi_word_u64(self.chain_id),
            abi_word_address(&self.verifying_contract),
        ])
    }
}

/// Left-pads a `u64` to a 32-byte big-endian ABI word (`uint256`).
pub(crate) fn abi_word_u64(value: u64) -> [u8; HASH_LEN] {
    let mut word = [0u8; HASH_LEN];
    word[HASH_LEN - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Left-pads an address to a 32-byte ABI word.
pub(crate) fn abi_word_address(address: &Address) -> [u8; HASH_LEN] {
    let mut word = [0u8; HASH_LEN];
    word[HASH_LEN - 20..].copy_from_slice(address.as_bytes());
    word
}

/// Derives commitments for one auction.
///
/// The domain separator is computed once at construction; [`commit`] is a
/// pure function of the participant address.
///
/// [`commit`]: CommitmentBuilder::commit
#[derive(Clone, Debug)]
pub struct CommitmentBuilder {
    separator: Hash256,
    auction_id: u64,
}

impl CommitmentBuilder {
    /// Creates a builder for `auction` using the domain name and version in
    /// `identity`.
    ///
    /// Fails with [`CredentialError::MissingNetwork`] when the chain id is 0,
    /// which no network uses and which would make the domain replayable
    /// across chains.
    pub fn new(auction: &AuctionRef, identity: &IdentityConfig) -> Result<Self, CredentialError> {
        Self::from_domain(&ContractDomain::for_auction(auction, identity), auction.auction_id)
    }

    /// Creates a builder from an explicit domain.
    pub fn from_domain(domain: &ContractDomain, auction_id: u64) -> Result<Self, CredentialError> {
        if domain.chain_id == 0 {
            return Err(CredentialError::MissingNetwork(
                "chain id 0 cannot be bound into the contract domain".to_string(),
            ));
        }

        Ok(Self {
            separator: domain.separator(),
            auction_id,
        })
    }

    /// Returns the cached domain separator.
    pub fn domain_separator(&self) -> &Hash256 {
        &self.separator
    }

    /// Computes the commitment for `address`.
    pub fn commit(&self, address: &Address) -> Commitment {
        Commitment(Hash256::keccak256_chunks([
            self.separator.0,
            abi_word_address(address),
            abi_word_u64(self.auction_id),
        ]))
    }
}
