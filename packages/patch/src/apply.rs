//! # Change Application
//!
//! Applies an ordered list of [`Change`]s to a text value.
//!
//! The whole sequence runs in memory against a character vector; either
//! every change applies and the new text is returned, or the first failure
//! aborts the batch with no partial result escaping.
//!
//! Positional ranges are adjusted by a running cumulative offset so a batch
//! of changes can all be addressed against the text the client saw.
//! Content-addressed changes re-derive their positions by searching the
//! current text, then reset the offset for whatever follows.

use crate::{Change, Operation, PatchError};

/// Apply `changes` in order to `content`, producing the new text.
pub fn apply(content: &str, changes: &[Change]) -> Result<String, PatchError> {
    let mut chars: Vec<char> = content.chars().collect();
    let mut cumulative_offset: i64 = 0;

    for change in changes {
        change.validate()?;

        if change.is_content_addressed() {
            apply_content_addressed(&mut chars, change, cumulative_offset)?;
            // Positions were re-derived from the current text; earlier
            // positional shifts no longer apply to later changes.
            cumulative_offset = 0;
        } else {
            let start = shift(change.range.start, cumulative_offset, chars.len())?;
            let end = shift(change.range.end, cumulative_offset, chars.len())?;
            let length_before = chars.len() as i64;
            splice(&mut chars, &change.operation, start, end, &change.text)?;
            cumulative_offset += chars.len() as i64 - length_before;
        }
    }

    Ok(chars.into_iter().collect())
}

fn apply_content_addressed(
    chars: &mut Vec<char>,
    change: &Change,
    cumulative_offset: i64,
) -> Result<(), PatchError> {
    let start = shift(change.range.start, cumulative_offset, chars.len())?;
    let end = shift(change.range.end, cumulative_offset, chars.len())?;

    // The range samples the search pattern out of the current text.
    let pattern: Vec<char> = chars[start..end].to_vec();
    let before: Vec<char> = context_chars(change.context_before.as_deref());
    let after: Vec<char> = context_chars(change.context_after.as_deref());

    let matches = find_occurrences(chars, &pattern, &before, &after);
    if matches.is_empty() {
        return Err(PatchError::NoMatchingOccurrence {
            pattern: pattern.iter().collect(),
        });
    }

    match change.occurrence {
        // Absent or -1: every qualifying occurrence, rightmost first so
        // earlier splices never invalidate pending positions.
        None | Some(-1) => {
            for &position in matches.iter().rev() {
                splice(
                    chars,
                    &change.operation,
                    position,
                    position + pattern.len(),
                    &change.text,
                )?;
            }
        }
        Some(n) if n >= 1 && (n as usize) <= matches.len() => {
            let position = matches[(n - 1) as usize];
            splice(
                chars,
                &change.operation,
                position,
                position + pattern.len(),
                &change.text,
            )?;
        }
        Some(n) => return Err(PatchError::InvalidOccurrence(n)),
    }

    Ok(())
}

fn context_chars(context: Option<&str>) -> Vec<char> {
    context.unwrap_or("").chars().collect()
}

/// All start positions of `pattern` whose surroundings satisfy the context
/// constraints, ascending. The scan advances one character per candidate,
/// so overlapping matches are all discoverable.
fn find_occurrences(chars: &[char], pattern: &[char], before: &[char], after: &[char]) -> Vec<usize> {
    let mut positions = Vec::new();
    if pattern.len() > chars.len() {
        return positions;
    }
    let last_start = chars.len() - pattern.len();
    for i in 0..=last_start {
        if chars[i..i + pattern.len()] == *pattern
            && before_matches(chars, i, before)
            && after_matches(chars, i + pattern.len(), after)
        {
            positions.push(i);
        }
    }
    positions
}

/// Empty context means "no constraint"; otherwise the text immediately
/// preceding the candidate must end with it.
fn before_matches(chars: &[char], at: usize, context: &[char]) -> bool {
    if context.is_empty() {
        return true;
    }
    if at < context.len() {
        return false;
    }
    chars[at - context.len()..at] == *context
}

/// Empty context means "no constraint"; otherwise the text immediately
/// following the match must start with it.
fn after_matches(chars: &[char], from: usize, context: &[char]) -> bool {
    if context.is_empty() {
        return true;
    }
    if from + context.len() > chars.len() {
        return false;
    }
    chars[from..from + context.len()] == *context
}

/// Resolve a client-supplied position against the cumulative offset,
/// rejecting anything that lands outside the current text.
fn shift(position: usize, offset: i64, length: usize) -> Result<usize, PatchError> {
    let shifted = position as i64 + offset;
    if shifted < 0 || shifted > length as i64 {
        return Err(PatchError::InvalidChangeFormat(format!(
            "position {position} resolves to {shifted}, outside text of length {length}"
        )));
    }
    Ok(shifted as usize)
}

fn splice(
    chars: &mut Vec<char>,
    operation: &Operation,
    start: usize,
    end: usize,
    text: &str,
) -> Result<(), PatchError> {
    if start > end || end > chars.len() {
        return Err(PatchError::InvalidChangeFormat(format!(
            "resolved range [{start}, {end}) is invalid for text of length {}",
            chars.len()
        )));
    }
    match operation {
        // Point insertion: end is ignored.
        Operation::Insert => {
            chars.splice(start..start, text.chars());
        }
        Operation::Delete => {
            chars.splice(start..end, std::iter::empty());
        }
        Operation::Replace => {
            chars.splice(start..end, text.chars());
        }
        Operation::Other(tag) => return Err(PatchError::UnknownOperation(tag.clone())),
    }
    Ok(())
}
