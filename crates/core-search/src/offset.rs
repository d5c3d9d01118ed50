//! Normalized-index → original-index translation.
//!
//! Normalization can expand one source char into several (U+FB01 `ﬁ` becomes
//! `fi`) or compose several into one (`e` + U+0301 becomes `é`). The table has
//! exactly one entry per char of the *normalized* text; entry `i` is the net
//! number of chars normalization added before normalized index `i` (counting
//! the expansion in progress). Subtracting it maps a normalized index back to
//! the first original char of its segment.

use crate::normalize::{Segment, segments};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetTable {
    cumulative: Vec<isize>,
    /// Original chars behind the segment owning each normalized index.
    widths: Vec<usize>,
}

impl OffsetTable {
    /// Build the table from the *original* text.
    pub fn build(original: &str) -> Self {
        Self::from_segments(&segments(original))
    }

    /// For each segment of `n` normalized chars the builder appends the
    /// running total, then `n - 1` further entries each one step larger.
    pub fn from_segments(segments: &[Segment]) -> Self {
        let (cumulative, widths, _) = segments.iter().fold(
            (Vec::new(), Vec::new(), 0isize),
            |(mut table, mut widths, total), seg| {
                let n = seg.normalized.chars().count();
                table.extend((0..n as isize).map(|k| total + k));
                widths.extend(std::iter::repeat_n(seg.width, n));
                (table, widths, total + seg.expansion())
            },
        );
        Self { cumulative, widths }
    }

    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<isize> {
        self.cumulative.get(idx).copied()
    }

    /// Entry at `idx`, saturating to the last entry past the end.
    pub fn at(&self, idx: usize) -> isize {
        self.get(idx)
            .or_else(|| self.cumulative.last().copied())
            .unwrap_or(0)
    }

    /// Original width of the segment holding normalized index `idx` (1 past the end).
    pub fn width(&self, idx: usize) -> usize {
        self.widths.get(idx).copied().unwrap_or(1)
    }

    pub fn as_slice(&self) -> &[isize] {
        &self.cumulative
    }
}
