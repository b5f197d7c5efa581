//! In-memory publication journal.
//!
//! Useful for unit tests and dry runs; nothing survives the process.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{JournalEntry, JournalKey, PublicationJournal, StorageError};

/// In-memory implementation of [`PublicationJournal`].
#[derive(Debug, Default)]
pub struct InMemoryJournal {
    entries: Mutex<HashMap<JournalKey, JournalEntry>>,
}

impl InMemoryJournal {
    /// Creates a new, empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded publications.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PublicationJournal for InMemoryJournal {
    fn get(&self, key: &JournalKey) -> Result<Option<JournalEntry>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &JournalKey, entry: &JournalEntry) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert(*key, entry.clone());
        Ok(())
    }
}
