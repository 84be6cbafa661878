//! Streaming file digests for artifact verification.
//!
//! Expected hashes may carry an algorithm prefix (`blake3:…`, `sha256:…`);
//! computed digests are bare lowercase hex.

use super::HashType;
use crate::core::error::{CookError, Result};
use sha2::{Digest, Sha256, Sha512};
use std::io::Read;
use std::path::Path;

const STREAM_BUF_SIZE: usize = 65536;

/// Guess the algorithm of `hash` from its prefix or hex length.
pub fn guess_hash_type(hash: &str) -> Option<HashType> {
    if let Some((prefix, _)) = hash.split_once(':') {
        return prefix.parse().ok();
    }
    if !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hash.len() {
        64 => Some(HashType::Sha256),
        128 => Some(HashType::Sha512),
        _ => None,
    }
}

/// `hash` without its `algorithm:` prefix, lowercased.
pub fn normalize(hash: &str) -> String {
    let bare = hash.split_once(':').map_or(hash, |(_, hex)| hex);
    bare.trim().to_ascii_lowercase()
}

/// Hex digest of everything `reader` yields.
pub fn hash_reader<R: Read>(mut reader: R, hash_type: HashType) -> std::io::Result<String> {
    let mut buf = vec![0u8; STREAM_BUF_SIZE];
    match hash_type {
        HashType::Blake3 => {
            let mut hasher = blake3::Hasher::new();
            stream(&mut reader, &mut buf, |chunk| {
                hasher.update(chunk);
            })?;
            Ok(hasher.finalize().to_hex().to_string())
        }
        HashType::Sha256 => {
            let mut hasher = Sha256::new();
            stream(&mut reader, &mut buf, |chunk| hasher.update(chunk))?;
            Ok(format!("{:x}", hasher.finalize()))
        }
        HashType::Sha512 => {
            let mut hasher = Sha512::new();
            stream(&mut reader, &mut buf, |chunk| hasher.update(chunk))?;
            Ok(format!("{:x}", hasher.finalize()))
        }
    }
}

fn stream<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    mut sink: impl FnMut(&[u8]),
) -> std::io::Result<()> {
    loop {
        let n = reader.read(buf)?;
        if n == 0 {
            return Ok(());
        }
        sink(&buf[..n]);
    }
}

/// Hex digest of the file at `path`.
pub fn hash_file(path: &Path, hash_type: HashType) -> Result<String> {
    let file = std::fs::File::open(path).map_err(|e| CookError::io(path, e))?;
    hash_reader(file, hash_type).map_err(|e| CookError::io(path, e))
}

/// Hash `path` and compare against `expected`. Returns the computed digest
/// and whether it matched.
pub fn verify_file(path: &Path, expected: &str, hash_type: HashType) -> Result<(String, bool)> {
    let actual = hash_file(path, hash_type)?;
    let matches = actual == normalize(expected);
    Ok((actual, matches))
}
