//! # Document Model
//!
//! A Document is a plain-text value plus the metadata the synchronization
//! protocol needs: a version that moves only on publish, and a fingerprint
//! that moves on every content mutation.
//!
//! ## Lifecycle
//!
//! ```text
//! Create → Patch/Update* → Publish → Patch/Update* → Publish → ...
//!   v0        v0 (fp′)      v1 + snapshot(v0)          v2 + snapshot(v1)
//! ```
//!
//! Every mutation is atomic content+fingerprint together; a Document is
//! never observed half-updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authoritative document state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub content: String,
    /// Starts at 0; increments only on publish.
    pub version: u64,
    /// Opaque digest of (content, version, updated_at); usable as a
    /// precondition on the next mutating call.
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable record of a document at publish time, one per version number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedSnapshot {
    pub document_id: String,
    pub version: u64,
    pub content: String,
    pub published_at: DateTime<Utc>,
}
