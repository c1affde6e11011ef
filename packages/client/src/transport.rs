//! Transport seam between the buffer and the authoritative store.
//!
//! The driver only cares about three outcomes: the write landed, the
//! write was rejected as stale, or the carrier failed and the write is
//! worth retrying. Everything HTTP-ish lives behind this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vellum_patch::Change;

/// Authoritative state returned by a successful patch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchResponse {
    pub content: String,
    pub version: u64,
    pub fingerprint: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Version/fingerprint precondition failed; reload before retrying.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The document is gone; treated like a conflict (reload).
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Carrier-level failure; the same write may be retried.
    #[error("Transient transport failure: {0}")]
    Transient(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Transient(_))
    }
}

/// One patch round-trip to the authoritative store.
#[async_trait]
pub trait PatchTransport: Send + Sync {
    async fn apply(
        &self,
        document_id: &str,
        changes: Vec<Change>,
        expected_fingerprint: Option<String>,
    ) -> Result<PatchResponse, TransportError>;
}
