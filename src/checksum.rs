//! SHA-256 artifact integrity checks.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

use crate::runtime::Runtime;

/// Computes the hex-encoded SHA-256 digest of a file.
#[tracing::instrument(skip(runtime))]
pub fn sha256_hex<R: Runtime>(runtime: &R, path: &Path) -> Result<String> {
    let mut reader = runtime
        .open(path)
        .with_context(|| format!("Failed to open {:?} for hashing", path))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = reader
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {:?} while hashing", path))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compares a file against an expected hex digest (case-insensitive).
pub fn matches_digest<R: Runtime>(runtime: &R, path: &Path, expected: &str) -> Result<bool> {
    let computed = sha256_hex(runtime, path)?;
    Ok(computed.eq_ignore_ascii_case(expected.trim()))
}
