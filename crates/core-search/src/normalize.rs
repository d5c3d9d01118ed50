//! Search normalization: NFKC compatibility composition, then lowercase.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::canonical_combining_class;

pub fn normalize(s: &str) -> String {
    s.nfkc().collect::<String>().to_lowercase()
}

/// A run of original chars that normalizes independently of its neighbours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Original chars in the run.
    pub width: usize,
    pub normalized: String,
}

impl Segment {
    /// Normalized chars minus original chars: positive for a ligature,
    /// negative when a base and its combining marks compose.
    pub fn expansion(&self) -> isize {
        self.normalized.chars().count() as isize - self.width as isize
    }
}

/// Split `s` into segments. A new segment opens only at a starter (combining
/// class 0) whose normalized form is unchanged by the chars before it, so the
/// segments' normalized forms concatenate to the searchable text.
pub fn segments(s: &str) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::new();
    let mut raw = String::new();
    let mut utf8 = [0u8; 4];
    for c in s.chars() {
        let alone = normalize(c.encode_utf8(&mut utf8));
        raw.push(c);
        if let Some(seg) = out.last_mut() {
            let joined = normalize(&raw);
            let independent = canonical_combining_class(c) == 0
                && joined.strip_prefix(seg.normalized.as_str()) == Some(alone.as_str());
            if !independent {
                seg.width += 1;
                seg.normalized = joined;
                continue;
            }
            raw.clear();
            raw.push(c);
        }
        out.push(Segment {
            width: 1,
            normalized: alone,
        });
    }
    out
}
