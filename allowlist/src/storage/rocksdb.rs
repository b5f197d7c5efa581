//! RocksDB-backed publication journal.
//!
//! Entries live in a dedicated `"publications"` column family, keyed by
//! [`JournalKey`] (32 bytes) with bincode-encoded [`JournalEntry`] values.

use std::{path::PathBuf, sync::Arc};

use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, DB, Options};

use super::{JournalEntry, JournalKey, PublicationJournal, StorageError};

const CF_PUBLICATIONS: &str = "publications";

/// Configuration for [`RocksDbJournal`].
#[derive(Clone, Debug)]
pub struct RocksDbConfig {
    /// Filesystem path to the RocksDB database directory.
    pub path: PathBuf,
    /// Whether to create the database and missing column families if they
    /// do not yet exist.
    pub create_if_missing: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/publication-journal"),
            create_if_missing: true,
        }
    }
}

/// RocksDB-backed implementation of [`PublicationJournal`].
pub struct RocksDbJournal {
    db: DB,
}

impl RocksDbJournal {
    /// Opens (or creates) a journal at `cfg.path`.
    pub fn open(cfg: &RocksDbConfig) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(cfg.create_if_missing);
        opts.create_missing_column_families(cfg.create_if_missing);

        let cfs = vec![
            ColumnFamilyDescriptor::new("default", Options::default()),
            ColumnFamilyDescriptor::new(CF_PUBLICATIONS, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, &cfg.path, cfs)?;
        Ok(Self { db })
    }

    fn cf_publications(&self) -> Result<Arc<BoundColumnFamily<'_>>, StorageError> {
        self.db
            .cf_handle(CF_PUBLICATIONS)
            .ok_or(StorageError::MissingColumnFamily(CF_PUBLICATIONS))
    }

    fn encode_entry(entry: &JournalEntry) -> Result<Vec<u8>, StorageError> {
        bincode::serde::encode_to_vec(entry, bincode::config::standard())
            .map_err(|e| StorageError::Encode(e.to_string()))
    }

    fn decode_entry(bytes: &[u8]) -> Result<JournalEntry, StorageError> {
        let (entry, _): (JournalEntry, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| StorageError::Corrupted(e.to_string()))?;
        Ok(entry)
    }
}

impl PublicationJournal for RocksDbJournal {
    fn get(&self, key: &JournalKey) -> Result<Option<JournalEntry>, StorageError> {
        let cf = self.cf_publications()?;
        match self.db.get_cf(&cf, key.as_bytes())? {
            Some(bytes) => Self::decode_entry(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn put(&self, key: &JournalKey, entry: &JournalEntry) -> Result<(), StorageError> {
        let cf = self.cf_publications()?;
        let bytes = Self::encode_entry(entry)?;
        self.db.put_cf(&cf, key.as_bytes(), bytes)?;
        Ok(())
    }
}
