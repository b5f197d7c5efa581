//! Chunk audit files.
//!
//! Chunk `i` is written to `<root>/signatures-<i>.json` in one shot: the JSON
//! goes to a temporary sibling first and is renamed into place, so a reader
//! never sees a partially written chunk.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::credential::CredentialError;
use crate::types::ChunkAuditFile;

/// Directory holding the audit files of a run.
#[derive(Clone, Debug)]
pub struct AuditDirectory {
    root: PathBuf,
}

impl AuditDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final path of chunk `chunk`'s audit file.
    pub fn path_for(&self, chunk: usize) -> PathBuf {
        self.root.join(format!("signatures-{chunk}.json"))
    }

    /// Writes `audit` as chunk `chunk`, replacing any previous file.
    pub fn write_chunk(&self, chunk: usize, audit: &ChunkAuditFile) -> Result<PathBuf, CredentialError> {
        fs::create_dir_all(&self.root).map_err(|e| CredentialError::fs(&self.root, e))?;

        let json = serde_json::to_vec_pretty(audit).map_err(|e| {
            CredentialError::SignatureEncodingError(format!("audit file encoding failed: {e}"))
        })?;

        let path = self.path_for(chunk);
        let tmp = self.root.join(format!(".signatures-{chunk}.json.tmp"));
        fs::write(&tmp, json).map_err(|e| CredentialError::fs(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| CredentialError::fs(&path, e))?;

        debug!(chunk, path = %path.display(), "audit file written");
        Ok(path)
    }

    /// Reads chunk `chunk`'s audit file back.
    pub fn read_chunk(&self, chunk: usize) -> Result<ChunkAuditFile, CredentialError> {
        let path = self.path_for(chunk);
        let bytes = fs::read(&path).map_err(|e| CredentialError::fs(&path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            CredentialError::SignatureEncodingError(format!(
                "malformed audit file {}: {e}",
                path.display()
            ))
        })
    }
}
