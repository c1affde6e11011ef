//! # Change Strategy Selector
//!
//! Decides, per discrete edit, whether to encode it positionally or by
//! content fingerprint (sample substring + occurrence + context).
//!
//! The decision is an ordered rule list, not a boolean soup: order is
//! semantically load-bearing (an empty selection is positional even in a
//! collaborative session), and each decision reports which rule fired so
//! tests can target rules individually.

use std::time::Duration;

use vellum_patch::{Change, Range};

/// Queue depth at which positional offsets are assumed stale.
pub const QUEUE_DEPTH_THRESHOLD: usize = 3;
/// Time since last successful sync after which positions are suspect.
pub const STALE_SYNC_THRESHOLD: Duration = Duration::from_millis(2000);

/// Raw context window captured either side of the selection.
const CONTEXT_WINDOW: usize = 15;
/// Characters kept adjacent to the selection boundary after trimming.
const CONTEXT_KEEP: usize = 10;

/// Everything the selector looks at for one edit.
#[derive(Debug, Clone)]
pub struct EditContext<'a> {
    /// Character range the edit replaces (empty for a pure insertion).
    pub selected_range: Range,
    /// The editor's current view of the document.
    pub document_content: &'a str,
    pub is_collaborative: bool,
    pub has_recent_remote_changes: bool,
    /// Edits already waiting in the buffer.
    pub queue_length: usize,
    pub time_since_last_sync: Duration,
}

/// Which rule in the ordered list made the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// 1. Pure insertions carry no sample text to address by.
    EmptySelection,
    /// 2. Remote writers may have shifted our offsets.
    RecentRemoteChanges,
    /// 3. A deep local queue means offsets were computed long ago.
    DeepQueue,
    /// 4. Too long since the last sync round-trip.
    StaleSync,
    /// 5. The selected text is ambiguous by position alone.
    AmbiguousSelection,
    /// 6. Collaborative sessions prefer content addressing.
    Collaborative,
    /// 7. Fallback.
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    Positional,
    ContentAddressed {
        /// 1-based index of the selection among occurrences of its text.
        occurrence: i64,
        context_before: String,
        context_after: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub strategy: Strategy,
    pub rule: Rule,
}

/// Run the rule list and, when content addressing wins, compute the
/// occurrence index and boundary context for the selection.
pub fn select(ctx: &EditContext) -> Decision {
    let rule = classify(ctx);
    let strategy = match rule {
        Rule::EmptySelection | Rule::Default => Strategy::Positional,
        _ => content_addressed(ctx),
    };
    Decision { strategy, rule }
}

fn classify(ctx: &EditContext) -> Rule {
    if ctx.selected_range.is_empty() {
        return Rule::EmptySelection;
    }
    if ctx.has_recent_remote_changes {
        return Rule::RecentRemoteChanges;
    }
    if ctx.queue_length >= QUEUE_DEPTH_THRESHOLD {
        return Rule::DeepQueue;
    }
    if ctx.time_since_last_sync >= STALE_SYNC_THRESHOLD {
        return Rule::StaleSync;
    }
    if occurrence_positions(ctx).len() > 1 {
        return Rule::AmbiguousSelection;
    }
    if ctx.is_collaborative {
        return Rule::Collaborative;
    }
    Rule::Default
}

fn content_addressed(ctx: &EditContext) -> Strategy {
    let chars: Vec<char> = ctx.document_content.chars().collect();
    let Range { start, end } = ctx.selected_range;
    let positions = occurrence_positions(ctx);

    // 1-based index of the occurrence starting exactly at the selection;
    // 1 when the selection start lines up with no occurrence.
    let occurrence = positions
        .iter()
        .position(|&p| p == start)
        .map(|i| i as i64 + 1)
        .unwrap_or(1);

    let before_from = start.saturating_sub(CONTEXT_WINDOW);
    let raw_before = &chars[before_from..start.min(chars.len())];
    let keep_from = raw_before.len().saturating_sub(CONTEXT_KEEP);
    let context_before: String = raw_before[keep_from..].iter().collect();

    let after_from = end.min(chars.len());
    let after_to = (end + CONTEXT_WINDOW).min(chars.len());
    let raw_after = &chars[after_from..after_to];
    let context_after: String = raw_after[..raw_after.len().min(CONTEXT_KEEP)].iter().collect();

    Strategy::ContentAddressed {
        occurrence,
        context_before,
        context_after,
    }
}

/// Start positions of the selected text throughout the document, the same
/// overlapping left-to-right scan the server uses.
fn occurrence_positions(ctx: &EditContext) -> Vec<usize> {
    let chars: Vec<char> = ctx.document_content.chars().collect();
    let Range { start, end } = ctx.selected_range;
    if start >= end || end > chars.len() {
        return Vec::new();
    }
    let pattern = &chars[start..end];
    let mut positions = Vec::new();
    for i in 0..=chars.len() - pattern.len() {
        if &chars[i..i + pattern.len()] == pattern {
            positions.push(i);
        }
    }
    positions
}

/// Encode one editor delta as a wire [`Change`], consulting the selector
/// for the addressing mode.
pub fn encode_edit(ctx: &EditContext, replacement: &str) -> Change {
    let decision = select(ctx);
    let Range { start, end } = ctx.selected_range;

    let mut change = if start == end {
        Change::insert(start, replacement)
    } else if replacement.is_empty() {
        Change::delete(start, end)
    } else {
        Change::replace(start, end, replacement)
    };

    if let Strategy::ContentAddressed {
        occurrence,
        context_before,
        context_after,
    } = decision.strategy
    {
        change.occurrence = Some(occurrence);
        change.context_before = Some(context_before);
        change.context_after = Some(context_after);
    }

    change
}
