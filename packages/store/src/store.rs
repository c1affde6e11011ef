//! # Document Store
//!
//! In-memory authoritative store for documents and their published
//! snapshots.
//!
//! Every mutating operation runs precondition check, patch application,
//! fingerprint recompute, and the write under a single lock acquisition:
//! one atomic conditional write, with no separate read-then-write window
//! for a concurrent request to slip through. A request that fails at any
//! step leaves the document row untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use vellum_patch::{apply, compute_fingerprint, Change};

use crate::clock::{Clock, SystemClock};
use crate::guard::check_preconditions;
use crate::{Document, PublishedSnapshot, StoreError};

#[derive(Default)]
struct StoreState {
    documents: HashMap<String, Document>,
    /// Snapshots per document, in publish order (version ascending).
    snapshots: HashMap<String, Vec<PublishedSnapshot>>,
}

pub struct DocumentStore {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        DocumentStore {
            state: Mutex::new(StoreState::default()),
            clock,
        }
    }

    /// Create a document at version 0.
    pub fn create(
        &self,
        id: impl Into<String>,
        initial_content: impl Into<String>,
    ) -> Result<Document, StoreError> {
        let id = id.into();
        let content = initial_content.into();
        let mut state = self.state.lock().unwrap();
        if state.documents.contains_key(&id) {
            return Err(StoreError::DuplicateDocument(id));
        }
        let now = self.clock.now();
        let doc = Document {
            fingerprint: compute_fingerprint(&content, 0, now),
            id: id.clone(),
            content,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        state.documents.insert(id.clone(), doc.clone());
        tracing::debug!(%id, "created document");
        Ok(doc)
    }

    pub fn get(&self, id: &str) -> Result<Document, StoreError> {
        let state = self.state.lock().unwrap();
        state
            .documents
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Apply a patch request: guard → apply → fingerprint → write, all in
    /// one transaction. The version does not move.
    pub fn apply_patch(
        &self,
        id: &str,
        changes: &[Change],
        expected_version: Option<u64>,
        expected_fingerprint: Option<&str>,
    ) -> Result<Document, StoreError> {
        let mut state = self.state.lock().unwrap();
        let doc = state
            .documents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        check_preconditions(doc, expected_version, expected_fingerprint)?;

        // Runs fully in memory against the current content; the row is
        // only touched once the whole batch has applied.
        let new_content = apply(&doc.content, changes)?;

        let now = self.clock.now();
        doc.content = new_content;
        doc.updated_at = now;
        doc.fingerprint = compute_fingerprint(&doc.content, doc.version, now);
        tracing::debug!(%id, version = doc.version, changes = changes.len(), "applied patch");
        Ok(doc.clone())
    }

    /// Replace the full content. This is the path the client's coalesced flush
    /// uses. Same transaction shape as `apply_patch`.
    pub fn update_content(
        &self,
        id: &str,
        content: impl Into<String>,
        expected_version: Option<u64>,
        expected_fingerprint: Option<&str>,
    ) -> Result<Document, StoreError> {
        let mut state = self.state.lock().unwrap();
        let doc = state
            .documents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        check_preconditions(doc, expected_version, expected_fingerprint)?;

        let now = self.clock.now();
        doc.content = content.into();
        doc.updated_at = now;
        doc.fingerprint = compute_fingerprint(&doc.content, doc.version, now);
        tracing::debug!(%id, version = doc.version, "updated content");
        Ok(doc.clone())
    }

    /// Publish: snapshot the current state, then bump the version and
    /// refingerprint. Both halves commit under the same lock scope; a
    /// reader never sees a snapshot without its version bump or vice
    /// versa.
    pub fn publish(&self, id: &str) -> Result<Document, StoreError> {
        let mut state = self.state.lock().unwrap();
        let StoreState {
            documents,
            snapshots,
        } = &mut *state;
        let doc = documents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let now = self.clock.now();
        snapshots
            .entry(doc.id.clone())
            .or_default()
            .push(PublishedSnapshot {
                document_id: doc.id.clone(),
                version: doc.version,
                content: doc.content.clone(),
                published_at: now,
            });

        doc.version += 1;
        doc.updated_at = now;
        doc.fingerprint = compute_fingerprint(&doc.content, doc.version, now);
        tracing::debug!(%id, version = doc.version, "published document");
        Ok(doc.clone())
    }

    pub fn get_snapshot(&self, id: &str, version: u64) -> Result<PublishedSnapshot, StoreError> {
        let state = self.state.lock().unwrap();
        state
            .snapshots
            .get(id)
            .and_then(|list| list.iter().find(|s| s.version == version))
            .cloned()
            .ok_or_else(|| StoreError::SnapshotNotFound {
                id: id.to_string(),
                version,
            })
    }

    /// All published snapshots for a document, version ascending.
    pub fn list_snapshots(&self, id: &str) -> Vec<PublishedSnapshot> {
        let state = self.state.lock().unwrap();
        state.snapshots.get(id).cloned().unwrap_or_default()
    }
}
