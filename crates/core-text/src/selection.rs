//! Half-open selection span kept consistent across buffer mutations.

use std::ops::Range;

/// Normalized `[start, end)` span (start <= end).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    /// Construct a span normalizing ordering so that start <= end.
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Insertion at a bound never extends the span.
    pub(crate) fn shift_for_insert(&mut self, at: usize, n: usize) {
        if self.start >= at {
            self.start += n;
        }
        if self.end > at {
            self.end += n;
        }
        // An empty span sitting on `at` moved start but not end.
        if self.end < self.start {
            self.end = self.start;
        }
    }

    pub(crate) fn collapse_for_delete(&mut self, removed: &Range<usize>) {
        self.start = crate::collapse_for_delete(self.start, removed);
        self.end = crate::collapse_for_delete(self.end, removed);
    }
}
