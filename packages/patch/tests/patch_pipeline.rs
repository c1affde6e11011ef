//! End-to-end patch tests: parse a JSON change list, apply it, check the
//! result. This is the same path a patch request takes through the store.

use proptest::prelude::*;
use vellum_patch::{apply, parse_changes, PatchError};

#[test]
fn parsed_batch_applies_like_constructed_batch() -> anyhow::Result<()> {
    let payload = r#"[
        {"operation": "replace", "range": {"start": 4, "end": 9}, "text": "slow"},
        {"operation": "insert", "range": {"start": 10, "end": 10}, "text": "lazy "},
        {"operation": "delete", "range": {"start": 18, "end": 19}}
    ]"#;
    let changes = parse_changes(payload)?;
    let result = apply("The quick brown fox", &changes)?;
    assert_eq!(result, "The slow lazy brown fo");
    Ok(())
}

#[test]
fn content_addressed_batch_from_wire() -> anyhow::Result<()> {
    let payload = r#"[
        {"operation": "replace", "range": {"start": 0, "end": 3}, "text": "qux",
         "occurrence": -1}
    ]"#;
    let changes = parse_changes(payload)?;
    assert_eq!(
        apply("foo bar foo baz foo", &changes)?,
        "qux bar qux baz qux"
    );
    Ok(())
}

#[test]
fn invalid_occurrence_rejected_before_application() {
    let payload = r#"[
        {"operation": "replace", "range": {"start": 0, "end": 3}, "text": "x",
         "occurrence": 0}
    ]"#;
    assert_eq!(
        parse_changes(payload).unwrap_err(),
        PatchError::InvalidOccurrence(0)
    );
}

#[test]
fn unknown_operation_rejected_before_application() {
    let payload = r#"[
        {"operation": "frobnicate", "range": {"start": 0, "end": 0}}
    ]"#;
    assert_eq!(
        parse_changes(payload).unwrap_err(),
        PatchError::UnknownOperation("frobnicate".to_string())
    );
}

proptest! {
    #[test]
    fn apply_of_empty_batch_is_identity(content in "\\PC*") {
        prop_assert_eq!(apply(&content, &[]).unwrap(), content);
    }

    #[test]
    fn whole_content_replace_yields_replacement(
        old in "\\PC*",
        new in "\\PC*",
    ) {
        let change = vellum_patch::Change::replace(0, old.chars().count(), new.clone());
        prop_assert_eq!(apply(&old, &[change]).unwrap(), new);
    }
}
