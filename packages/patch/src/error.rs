//! Error types for the patch engine

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The change carried an operation tag outside the known set.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Occurrence/context search found no qualifying match.
    #[error("No matching occurrence for pattern {pattern:?}")]
    NoMatchingOccurrence { pattern: String },

    /// Occurrence index is 0, negative (other than -1), or past the match count.
    #[error("Invalid occurrence: {0}")]
    InvalidOccurrence(i64),

    /// Schema-level rejection: inverted range, out-of-bounds position,
    /// or a payload that does not parse as a change list.
    #[error("Invalid change format: {0}")]
    InvalidChangeFormat(String),
}
