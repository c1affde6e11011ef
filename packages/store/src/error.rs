//! Error types for the document store

use thiserror::Error;
use vellum_patch::PatchError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Snapshot not found: {id} version {version}")]
    SnapshotNotFound { id: String, version: u64 },

    #[error("Document already exists: {0}")]
    DuplicateDocument(String),

    /// Client expected a different version; the write is stale.
    #[error("Version conflict: expected {expected}, document is at {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    /// Client's fingerprint no longer matches the stored content.
    #[error("Fingerprint mismatch")]
    FingerprintMismatch,

    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),
}

impl StoreError {
    /// Conflicts are retryable after the client reloads authoritative
    /// state; everything else is a hard rejection of the request.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::VersionConflict { .. } | StoreError::FingerprintMismatch
        )
    }
}
