//! Content fingerprinting for optimistic concurrency.
//!
//! The fingerprint digests `(content, version, updated_at)` so it changes on
//! every content mutation even though the version only moves on publish.
//! Callers treat it as an opaque string usable as a precondition.

use chrono::{DateTime, Utc};

/// Hex length of the exposed fingerprint. 64 bits of blake3 output is
/// plenty for a per-document conditional-write token.
const FINGERPRINT_HEX_LEN: usize = 16;

/// Compute the fingerprint of a document state.
pub fn compute_fingerprint(content: &str, version: u64, updated_at: DateTime<Utc>) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(content.len() as u64).to_le_bytes());
    hasher.update(content.as_bytes());
    hasher.update(&version.to_le_bytes());
    hasher.update(&updated_at.timestamp_micros().to_le_bytes());
    hasher.finalize().to_hex().as_str()[..FINGERPRINT_HEX_LEN].to_string()
}
