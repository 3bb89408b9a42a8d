//! Output side of the pipeline: newline normalization, content hashing, and
//! the atomic write protocol.

mod atomic;
mod normalize;

pub use atomic::{write_atomic, WriteError};
pub use normalize::{normalize_files, NormalizeError};

use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Hex SHA-256 of a byte sequence.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Hex SHA-256 of the normalized concatenation of `paths`.
///
/// This is the hash the concatenation path of the builder compares against;
/// it never touches the output file.
pub fn hash_files(paths: &[PathBuf]) -> Result<String, NormalizeError> {
    let content = normalize_files(paths)?;
    Ok(sha256_hex(content.as_bytes()))
}
