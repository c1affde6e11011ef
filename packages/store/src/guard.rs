//! # Concurrency Guard
//!
//! Optimistic-concurrency precondition check. Version and fingerprint
//! checks are independent and both enforced when both are supplied (AND
//! semantics); supplying neither disables conflict detection for that
//! call, which is an explicit last-write-wins opt-out, never a silent merge.

use crate::{Document, StoreError};

pub fn check_preconditions(
    doc: &Document,
    expected_version: Option<u64>,
    expected_fingerprint: Option<&str>,
) -> Result<(), StoreError> {
    if let Some(expected) = expected_version {
        if doc.version != expected {
            return Err(StoreError::VersionConflict {
                expected,
                actual: doc.version,
            });
        }
    }
    if let Some(expected) = expected_fingerprint {
        if doc.fingerprint != expected {
            return Err(StoreError::FingerprintMismatch);
        }
    }
    Ok(())
}
