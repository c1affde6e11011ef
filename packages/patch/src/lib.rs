//! # Vellum Patch
//!
//! Core patch engine for the Vellum document editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ client: edits → Change encoding + batching  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ patch: Change model + application           │
//! │  - Validate incoming changes                │
//! │  - Positional and content-addressed edits   │
//! │  - Content fingerprint digest               │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ store: preconditions + atomic persistence   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Pure application**: `apply` never mutates its input; a batch either
//!    fully applies or fails with nothing persisted
//! 2. **Character addressing**: all offsets count Unicode scalar values,
//!    the same convention clients use to compute them
//! 3. **Validate before apply**: malformed changes are rejected at the
//!    parse boundary, not discovered mid-mutation

mod apply;
mod change;
mod error;
mod fingerprint;

pub use apply::apply;
pub use change::{parse_change, parse_changes, Change, Operation, Range};
pub use error::PatchError;
pub use fingerprint::compute_fingerprint;
