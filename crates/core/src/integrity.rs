//! Document checksum verification.
//!
//! The file store supplies a checksum at upload time; before a document is
//! attached to a stage the engine recomputes the digest over the current
//! file contents and compares it here. The comparison is constant time so
//! the check leaks nothing about how far a forged value matches.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Compare a stored checksum against a freshly computed one.
///
/// Returns `false` for any mismatch, including length differences.
pub fn checksums_match(stored: &str, computed: &str) -> bool {
    constant_time_eq(stored.as_bytes(), computed.as_bytes())
}

/// Verify file contents against a stored checksum.
pub fn verify(stored_checksum: &str, contents: &[u8]) -> bool {
    checksums_match(stored_checksum, &sha256_hex(contents))
}

/// Byte-wise constant-time equality. Examines every byte of equal-length
/// inputs regardless of where the first difference occurs.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
