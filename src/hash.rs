//! BLAKE3 digests for dex outputs and graph fingerprints

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use blake3::Hasher;

use crate::error::{Result, file_not_found, file_read_failed};

/// Prefix of every digest written by dexgraph
pub const HASH_PREFIX: &str = "blake3:";

/// Size and digest of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    pub size: u64,
    pub hash: String,
}

/// Digest of an in-memory buffer
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{HASH_PREFIX}{}", blake3::hash(bytes).to_hex())
}

/// Stream a file through BLAKE3, counting its bytes on the way
///
/// # Errors
///
/// Returns [`crate::error::DexGraphError::FileNotFound`] for a missing file
/// and [`crate::error::DexGraphError::FileReadFailed`] for read errors.
pub fn digest_file(path: &Path) -> Result<FileDigest> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            file_not_found(path.display().to_string())
        } else {
            file_read_failed(path.display().to_string(), e.to_string())
        }
    })?;

    let mut reader = BufReader::new(file);
    let mut hasher = Hasher::new();
    let mut buffer = [0u8; 8192];
    let mut size = 0u64;
    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|e| file_read_failed(path.display().to_string(), e.to_string()))?;
        if read == 0 {
            break;
        }
        size += read as u64;
        hasher.update(&buffer[..read]);
    }

    Ok(FileDigest {
        size,
        hash: format!("{HASH_PREFIX}{}", hasher.finalize().to_hex()),
    })
}

/// Compare digests, tolerating a missing prefix on either side
pub fn verify_hash(expected: &str, actual: &str) -> bool {
    let strip = |h: &str| h.strip_prefix(HASH_PREFIX).unwrap_or(h).to_ascii_lowercase();
    strip(expected) == strip(actual)
}
