//! Normalized search: match on a normalized copy, highlight the original.
//!
//! Matching runs on `normalize(text[caret..])` against `normalize(query)`. The
//! match index lives in normalized space; [`OffsetTable`] maps it back so the
//! returned range spans exactly the original chars that produced the match,
//! even when a single original char (a ligature) expanded into several or a
//! base char and its combining marks composed into one.
//!
//! All ranges are char indices into the full buffer text.

use std::ops::Range;
use tracing::{debug, trace};

pub mod normalize;
pub mod offset;

pub use normalize::{Segment, normalize, segments};
pub use offset::OffsetTable;

/// Transient per-invocation state.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub query: String,
    pub tail: String,
    pub table: OffsetTable,
    caret: usize,
}

impl SearchState {
    /// Prepare a search of `text` from char index `caret` to the end.
    /// `caret` past the end is treated as the end.
    pub fn new(text: &str, caret: usize, query: &str) -> Self {
        let original_tail: String = text.chars().skip(caret).collect();
        let caret = caret.min(text.chars().count());
        let segments = segments(&original_tail);
        Self {
            query: normalize(query),
            tail: segments.iter().map(|s| s.normalized.as_str()).collect(),
            table: OffsetTable::from_segments(&segments),
            caret,
        }
    }

    /// Char index of the first occurrence of the query in the normalized tail.
    pub fn locate(&self) -> Option<usize> {
        if self.query.is_empty() {
            return None;
        }
        let byte = self.tail.find(&self.query)?;
        Some(self.tail[..byte].chars().count())
    }

    /// Original-text range for a match at normalized index `idx`.
    pub fn highlight_for(&self, idx: usize) -> Range<usize> {
        let qlen = self.query.chars().count();
        let last = idx + qlen.saturating_sub(1);
        let start = (idx + self.caret) as isize - self.table.at(idx);
        let shrink = self.table.at(last) - self.table.at(idx);
        // A match ending on a composed char covers all of its original chars.
        let grow = self.table.width(last) as isize - 1;
        let end = (start + qlen as isize - shrink + grow).max(start);
        trace!(target: "search", idx, start, end, shrink, grow, "highlight_mapped");
        let start = usize::try_from(start).unwrap_or(0);
        start..usize::try_from(end).unwrap_or(start)
    }
}

/// Find `query` in `text` starting at `caret`; returns the original-text
/// range to highlight. An empty query, or a buffer that is empty or only
/// whitespace, never matches.
pub fn find(text: &str, caret: usize, query: &str) -> Option<Range<usize>> {
    if query.is_empty() || text.trim().is_empty() {
        return None;
    }
    let state = SearchState::new(text, caret, query);
    let Some(idx) = state.locate() else {
        debug!(target: "search", caret, query_len = query.chars().count(), "no_match");
        return None;
    };
    let text_len = text.chars().count();
    let range = state.highlight_for(idx);
    let range = range.start.min(text_len)..range.end.min(text_len);
    debug!(target: "search", caret, start = range.start, end = range.end, "match");
    Some(range)
}
