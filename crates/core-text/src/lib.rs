//! Rope-based text buffer with caret and selection state.
//!
//! All indices are char (Unicode scalar) offsets. The buffer owns the caret and
//! an optional half-open selection; every mutation adjusts both in the same
//! call so that `0 <= idx <= len_chars()` holds whenever the buffer is
//! observable.
//!
//! Gravity:
//! - Insertion exactly at the caret leaves the caret *before* the inserted
//!   text. Callers that want "type and advance" semantics move the caret
//!   themselves afterwards (the key-combination engine and the typed-text path
//!   both do this explicitly).
//! - A selection never grows by insertion at one of its bounds.
//! - Deletion collapses any bound inside the removed range onto its start.

use ropey::Rope;
use std::ops::Range;
use thiserror::Error;
use tracing::trace;

pub mod selection;

pub use selection::Selection;

/// Rejected buffer access. The buffer is left untouched whenever this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("range {start}..{end} out of bounds for buffer of {len} chars")]
    OutOfRange { start: usize, end: usize, len: usize },
}

pub type BufferResult<T> = Result<T, BufferError>;

#[derive(Clone, Default)]
pub struct TextBuffer {
    rope: Rope,
    caret: usize,
    selection: Option<Selection>,
    /// Bumped on every mutation that changed the text.
    revision: u64,
}

impl std::fmt::Debug for TextBuffer {
    // Content is never printed; logs and panics only carry shape.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBuffer")
            .field("len_chars", &self.rope.len_chars())
            .field("caret", &self.caret)
            .field("selection", &self.selection)
            .field("revision", &self.revision)
            .finish()
    }
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a buffer holding `content` with the caret at 0.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Self {
        Self {
            rope: Rope::from_str(content),
            caret: 0,
            selection: None,
            revision: 0,
        }
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace the whole text. The caret is clamped to the new length and any
    /// selection is dropped. Setting identical content is not a mutation.
    pub fn set_text(&mut self, content: &str) {
        if self.rope == content {
            return;
        }
        self.rope = Rope::from_str(content);
        self.caret = self.caret.min(self.rope.len_chars());
        self.selection = None;
        self.revision += 1;
        trace!(target: "text", len = self.rope.len_chars(), caret = self.caret, "set_text");
    }

    /// Insert `s` at char index `at` (`at == len_chars()` appends).
    pub fn insert(&mut self, at: usize, s: &str) -> BufferResult<()> {
        let len = self.len_chars();
        if at > len {
            return Err(BufferError::OutOfRange {
                start: at,
                end: at,
                len,
            });
        }
        if s.is_empty() {
            return Ok(());
        }
        let n = s.chars().count();
        self.rope.insert(at, s);
        if self.caret > at {
            self.caret += n;
        }
        if let Some(sel) = self.selection.as_mut() {
            sel.shift_for_insert(at, n);
        }
        self.revision += 1;
        trace!(target: "text", at, inserted = n, caret = self.caret, "insert");
        Ok(())
    }

    /// Remove the half-open char range. Returns the removed text.
    pub fn delete(&mut self, range: Range<usize>) -> BufferResult<String> {
        self.check_range(&range)?;
        if range.is_empty() {
            return Ok(String::new());
        }
        let removed = self.rope.slice(range.clone()).to_string();
        self.rope.remove(range.clone());
        self.caret = collapse_for_delete(self.caret, &range);
        if let Some(sel) = self.selection.as_mut() {
            sel.collapse_for_delete(&range);
        }
        self.revision += 1;
        trace!(
            target: "text",
            start = range.start,
            end = range.end,
            caret = self.caret,
            "delete"
        );
        Ok(removed)
    }

    pub fn set_caret(&mut self, index: usize) -> BufferResult<()> {
        let len = self.len_chars();
        if index > len {
            return Err(BufferError::OutOfRange {
                start: index,
                end: index,
                len,
            });
        }
        self.caret = index;
        Ok(())
    }

    /// Select `range` and place the caret at its end (so a following forward
    /// search continues after the selection).
    pub fn select(&mut self, range: Range<usize>) -> BufferResult<()> {
        self.check_range(&range)?;
        self.selection = Some(Selection::new(range.start, range.end));
        self.caret = range.end;
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Text of the half-open char range, or `None` when it does not fit.
    pub fn slice(&self, range: Range<usize>) -> Option<String> {
        if range.start > range.end || range.end > self.len_chars() {
            return None;
        }
        Some(self.rope.slice(range).to_string())
    }

    /// Whether the chars in `range` equal `expected` exactly. Out-of-bounds ranges never match.
    pub fn matches_at(&self, range: Range<usize>, expected: &str) -> bool {
        if range.start > range.end || range.end > self.len_chars() {
            return false;
        }
        self.rope.slice(range).chars().eq(expected.chars())
    }

    /// Index just after the nearest `'\n'` before `at`, or 0 when there is none.
    pub fn line_start(&self, at: usize) -> usize {
        let mut idx = at.min(self.len_chars());
        let mut chars = self.rope.chars_at(idx);
        while let Some(c) = chars.prev() {
            if c == '\n' {
                break;
            }
            idx -= 1;
        }
        idx
    }

    /// Text from the caret to the end of the buffer.
    pub fn tail_from_caret(&self) -> String {
        self.rope.slice(self.caret..).to_string()
    }

    fn check_range(&self, range: &Range<usize>) -> BufferResult<()> {
        let len = self.len_chars();
        if range.start > range.end || range.end > len {
            return Err(BufferError::OutOfRange {
                start: range.start,
                end: range.end,
                len,
            });
        }
        Ok(())
    }
}

pub(crate) fn collapse_for_delete(idx: usize, range: &Range<usize>) -> usize {
    if idx >= range.end {
        idx - (range.end - range.start)
    } else if idx > range.start {
        range.start
    } else {
        idx
    }
}
