//! # Change Model
//!
//! Wire-level edit operations against a plain-text document.
//!
//! ## Design Principles
//!
//! 1. **Tagged variants**: operation kind is an explicit tag, never inferred
//! 2. **Validated**: every change passes [`Change::validate`] before application
//! 3. **Two addressing modes**: positional ranges, or a content-addressed
//!    sample substring qualified by occurrence index and adjacent context
//!
//! ## Addressing Semantics
//!
//! When `occurrence`, `context_before`, and `context_after` are all absent,
//! `range` is a pair of character offsets interpreted against the running
//! cumulative offset of the batch. When any of them is present, `range`
//! instead points at a sample substring of the *current* (already mutated)
//! text, and that substring becomes the search pattern.
//!
//! Offsets are character offsets (Unicode scalar values) end-to-end; both
//! the client encoder and the server applier count with `str::chars`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::PatchError;

/// Edit operation kind.
///
/// An unrecognized wire tag deserializes to `Other` so the request can be
/// rejected as `UnknownOperation` rather than as a generic parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Insert,
    Delete,
    Replace,
    Other(String),
}

impl Operation {
    pub fn as_str(&self) -> &str {
        match self {
            Operation::Insert => "insert",
            Operation::Delete => "delete",
            Operation::Replace => "replace",
            Operation::Other(tag) => tag,
        }
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(match tag.as_str() {
            "insert" => Operation::Insert,
            "delete" => Operation::Delete,
            "replace" => Operation::Replace,
            _ => Operation::Other(tag),
        })
    }
}

/// Half-open character range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        Range { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One edit operation within a patch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub operation: Operation,
    pub range: Range,
    /// Payload for insert/replace; ignored for delete.
    #[serde(default)]
    pub text: String,
    /// 1-based match index, or -1 for "all matches".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<i64>,
    /// Text that must immediately precede a qualifying match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_before: Option<String>,
    /// Text that must immediately follow a qualifying match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_after: Option<String>,
}

impl Change {
    /// Point insertion at `at` (end of range is ignored for inserts).
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Change {
            operation: Operation::Insert,
            range: Range::new(at, at),
            text: text.into(),
            occurrence: None,
            context_before: None,
            context_after: None,
        }
    }

    pub fn delete(start: usize, end: usize) -> Self {
        Change {
            operation: Operation::Delete,
            range: Range::new(start, end),
            text: String::new(),
            occurrence: None,
            context_before: None,
            context_after: None,
        }
    }

    pub fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Change {
            operation: Operation::Replace,
            range: Range::new(start, end),
            text: text.into(),
            occurrence: None,
            context_before: None,
            context_after: None,
        }
    }

    pub fn with_occurrence(mut self, occurrence: i64) -> Self {
        self.occurrence = Some(occurrence);
        self
    }

    pub fn with_context_before(mut self, context: impl Into<String>) -> Self {
        self.context_before = Some(context.into());
        self
    }

    pub fn with_context_after(mut self, context: impl Into<String>) -> Self {
        self.context_after = Some(context.into());
        self
    }

    /// True when any occurrence/context field routes this change through
    /// pattern search instead of positional offsets.
    pub fn is_content_addressed(&self) -> bool {
        self.occurrence.is_some() || self.context_before.is_some() || self.context_after.is_some()
    }

    /// Structural validation, run before any application is attempted.
    pub fn validate(&self) -> Result<(), PatchError> {
        if let Operation::Other(tag) = &self.operation {
            return Err(PatchError::UnknownOperation(tag.clone()));
        }
        if self.range.start > self.range.end {
            return Err(PatchError::InvalidChangeFormat(format!(
                "range start {} exceeds end {}",
                self.range.start, self.range.end
            )));
        }
        if let Some(occurrence) = self.occurrence {
            if occurrence == 0 || (occurrence < 0 && occurrence != -1) {
                return Err(PatchError::InvalidOccurrence(occurrence));
            }
        }
        Ok(())
    }
}

/// Strict parse boundary for incoming change lists.
///
/// Payloads that do not deserialize reject as `InvalidChangeFormat`;
/// structural problems in individual changes reject with their own
/// classification before anything touches a document.
pub fn parse_changes(payload: &str) -> Result<Vec<Change>, PatchError> {
    let changes: Vec<Change> = serde_json::from_str(payload)
        .map_err(|e| PatchError::InvalidChangeFormat(e.to_string()))?;
    for change in &changes {
        change.validate()?;
    }
    Ok(changes)
}

/// Deserialize a single change, mapping parse failures to the same
/// classification as [`parse_changes`].
pub fn parse_change(value: serde_json::Value) -> Result<Change, PatchError> {
    let change: Change = serde_json::from_value(value)
        .map_err(|e| PatchError::InvalidChangeFormat(e.to_string()))?;
    change.validate()?;
    Ok(change)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_round_trips_known_tags() {
        for (op, tag) in [
            (Operation::Insert, "\"insert\""),
            (Operation::Delete, "\"delete\""),
            (Operation::Replace, "\"replace\""),
        ] {
            assert_eq!(serde_json::to_string(&op).unwrap(), tag);
            assert_eq!(serde_json::from_str::<Operation>(tag).unwrap(), op);
        }
    }

    #[test]
    fn test_unknown_tag_is_preserved_and_rejected() {
        let change = parse_change(serde_json::json!({
            "operation": "transmogrify",
            "range": {"start": 0, "end": 0},
            "text": ""
        }));
        assert_eq!(
            change,
            Err(PatchError::UnknownOperation("transmogrify".to_string()))
        );
    }

    #[test]
    fn test_inverted_range_rejected() {
        let change = Change::replace(5, 2, "x");
        assert!(matches!(
            change.validate(),
            Err(PatchError::InvalidChangeFormat(_))
        ));
    }

    #[test]
    fn test_occurrence_zero_and_negative_rejected() {
        assert_eq!(
            Change::replace(0, 3, "x").with_occurrence(0).validate(),
            Err(PatchError::InvalidOccurrence(0))
        );
        assert_eq!(
            Change::replace(0, 3, "x").with_occurrence(-5).validate(),
            Err(PatchError::InvalidOccurrence(-5))
        );
        assert!(Change::replace(0, 3, "x").with_occurrence(-1).validate().is_ok());
        assert!(Change::replace(0, 3, "x").with_occurrence(1).validate().is_ok());
    }

    #[test]
    fn test_parse_changes_rejects_malformed_payload() {
        assert!(matches!(
            parse_changes("{not json"),
            Err(PatchError::InvalidChangeFormat(_))
        ));
        assert!(matches!(
            parse_changes(r#"[{"operation": "insert"}]"#),
            Err(PatchError::InvalidChangeFormat(_))
        ));
    }

    #[test]
    fn test_parse_changes_accepts_camel_case_context_fields() {
        let changes = parse_changes(
            r#"[{
                "operation": "replace",
                "range": {"start": 4, "end": 7},
                "text": "new",
                "occurrence": 2,
                "contextBefore": "the ",
                "contextAfter": " fox"
            }]"#,
        )
        .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].occurrence, Some(2));
        assert_eq!(changes[0].context_before.as_deref(), Some("the "));
        assert_eq!(changes[0].context_after.as_deref(), Some(" fox"));
        assert!(changes[0].is_content_addressed());
    }
}
