//! Address list input and chunking.

use std::fs;
use std::path::Path;

use crate::credential::CredentialError;

/// Splits a comma-separated address list, trimming every entry.
///
/// Empty entries (a trailing comma, blank lines) are dropped; everything
/// else is kept verbatim and validated later, so a malformed entry fails
/// the chunk it belongs to.
pub fn parse_address_list(contents: &str) -> Vec<String> {
    contents
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads and splits the address file at `path`.
pub fn read_address_file(path: &Path) -> Result<Vec<String>, CredentialError> {
    let contents = fs::read_to_string(path).map_err(|e| CredentialError::fs(path, e))?;
    Ok(parse_address_list(&contents))
}

/// Number of chunks needed for `len` addresses: `⌈len / chunk_size⌉`.
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size.max(1))
}
