//! Persistence for batch runs.
//!
//! Two kinds of state leave the process:
//!
//! - the per-chunk audit files ([`audit::AuditDirectory`]), and
//! - the optional publication journal ([`PublicationJournal`]), which
//!   remembers which addresses already have an acknowledged upload so a
//!   re-run of the same address list does not publish them twice.
//!
//! Journal backends:
//!
//! - an in-memory journal ([`mem::InMemoryJournal`]) suitable for tests,
//! - a RocksDB-backed journal ([`rocksdb::RocksDbJournal`]) for real runs.

pub mod audit;
pub mod mem;
pub mod rocksdb;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::credential::CredentialError;
use crate::types::{Commitment, HASH_LEN};

pub use audit::AuditDirectory;
pub use mem::InMemoryJournal;
pub use rocksdb::{RocksDbConfig, RocksDbJournal};

/// Journal key: BLAKE3 over the participant's commitment.
///
/// The commitment binds the contract domain (name, version, chain id,
/// contract address), the auction id and the participant, so a journaled
/// signature is only ever reused for the digest it was made over.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct JournalKey(pub [u8; HASH_LEN]);

impl JournalKey {
    const DOMAIN: &'static [u8] = b"allowlist/publication/v2";

    pub fn new(commitment: &Commitment) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(Self::DOMAIN);
        hasher.update(commitment.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

/// What is remembered about a published address.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Address text as it appeared in the audit file.
    pub address: String,
    /// `0x`-hex `v‖r‖s` signature, reused verbatim on resume.
    pub signature: String,
    /// Content id reported by the pinning service, if any.
    pub cid: Option<String>,
}

/// Storage-level error type.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Underlying RocksDB error.
    #[error("rocksdb: {0}")]
    RocksDb(#[from] ::rocksdb::Error),
    /// Required column family was not found.
    #[error("missing column family {0:?}")]
    MissingColumnFamily(&'static str),
    /// A stored value could not be decoded.
    #[error("corrupted journal entry: {0}")]
    Corrupted(String),
    /// The value could not be encoded.
    #[error("journal entry encoding failed: {0}")]
    Encode(String),
    /// A lock around an in-memory backend was poisoned.
    #[error("journal lock poisoned")]
    Poisoned,
}

impl From<StorageError> for CredentialError {
    fn from(e: StorageError) -> Self {
        CredentialError::Journal(e.to_string())
    }
}

/// Durable "already published" set.
///
/// Writes happen only after the pinning service acknowledged the upload,
/// so every key present here corresponds to a pinned record.
pub trait PublicationJournal {
    fn get(&self, key: &JournalKey) -> Result<Option<JournalEntry>, StorageError>;

    fn put(&self, key: &JournalKey, entry: &JournalEntry) -> Result<(), StorageError>;
}

impl<T: PublicationJournal + ?Sized> PublicationJournal for Arc<T> {
    fn get(&self, key: &JournalKey) -> Result<Option<JournalEntry>, StorageError> {
        (**self).get(key)
    }

    fn put(&self, key: &JournalKey, entry: &JournalEntry) -> Result<(), StorageError> {
        (**self).put(key, entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{CommitmentBuilder, IdentityConfig};
    use crate::types::{Address, AuctionRef};

    fn key(auction_id: u64, chain_id: u64, contract: &str, participant: &str) -> JournalKey {
        let auction = AuctionRef {
            auction_id,
            chain_id,
            allow_list_contract: Address::parse(contract).unwrap(),
        };
        let commitments = CommitmentBuilder::new(&auction, &IdentityConfig::default()).unwrap();
        JournalKey::new(&commitments.commit(&Address::parse(participant).unwrap()))
    }

    const CONTRACT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
    const OTHER_CONTRACT: &str = "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB";
    const LOWER: &str = "0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359";
    const CHECKSUMMED: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";

    #[test]
    fn journal_key_ignores_address_case() {
        assert_eq!(key(7, 100, CONTRACT, LOWER), key(7, 100, CONTRACT, CHECKSUMMED));
    }

    #[test]
    fn journal_key_binds_auction_chain_and_contract() {
        let base = key(7, 100, CONTRACT, LOWER);
        assert_ne!(base, key(8, 100, CONTRACT, LOWER));
        assert_ne!(base, key(7, 1, CONTRACT, LOWER));
        assert_ne!(base, key(7, 100, OTHER_CONTRACT, LOWER));
    }
}
