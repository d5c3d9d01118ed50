//! Key-binding rule source: a TOML list of `[[binding]]` records.
//!
//! ```toml
//! [[binding]]
//! literal = "    "
//! ctrl = true
//! key = "I"
//! anchor = "start"
//! task = "insert"
//! ```
//!
//! The source is all-or-nothing. If any record fails to convert, no rules are
//! returned and the caller runs with an empty rule set.

use core_keymap::{KeyRule, RuleError, RuleRecord};
use serde::Deserialize;
use std::{fs, io, path::Path, path::PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum KeymapError {
    #[error("key-binding file {0} not found")]
    NotFound(PathBuf),
    #[error("failed to read key-binding file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed key-binding source")]
    Parse(#[from] toml::de::Error),
    #[error("binding #{index} is invalid")]
    InvalidRule {
        index: usize,
        #[source]
        source: RuleError,
    },
}

#[derive(Debug, Deserialize)]
struct KeymapDocument {
    #[serde(default)]
    binding: Vec<RuleRecord>,
}

/// Parse a rule source held in memory. Rules keep file order.
pub fn parse_keymap(content: &str) -> Result<Vec<KeyRule>, KeymapError> {
    let doc: KeymapDocument = toml::from_str(content)?;
    doc.binding
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            KeyRule::try_from(record).map_err(|source| KeymapError::InvalidRule { index, source })
        })
        .collect()
}

pub fn load_keymap(path: &Path) -> Result<Vec<KeyRule>, KeymapError> {
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            KeymapError::NotFound(path.to_path_buf())
        } else {
            KeymapError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let rules = parse_keymap(&content)?;
    info!(target: "config", path = %path.display(), rules = rules.len(), "keymap_loaded");
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_keymap::{Anchor, Task};
    use pretty_assertions::assert_eq;

    const INDENT: &str = r#"
[[binding]]
literal = "    "
ctrl = true
key = "i"
anchor = "start"
task = "insert"

[[binding]]
literal = "X"
ctrl = true
key = "D"
anchor = "caret"
task = "insert"
"#;

    #[test]
    fn parses_records_in_file_order() {
        let rules = parse_keymap(INDENT).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].literal(), "    ");
        assert_eq!(rules[0].anchor(), Anchor::LineStart);
        assert_eq!(rules[1].literal(), "X");
        assert_eq!(rules[1].task(), Task::Insert);
        assert_eq!(rules[1].key().to_string(), "D");
    }

    #[test]
    fn empty_source_has_no_rules() {
        assert!(parse_keymap("").unwrap().is_empty());
    }

    #[test]
    fn one_bad_key_rejects_the_whole_source() {
        let src = format!(
            "{INDENT}\n[[binding]]\nliteral = \"a\"\nkey = \"NotAKey\"\nanchor = \"caret\"\ntask = \"delete\"\n"
        );
        match parse_keymap(&src) {
            Err(KeymapError::InvalidRule { index, .. }) => assert_eq!(index, 2),
            other => panic!("expected InvalidRule, got {other:?}"),
        }
    }

    #[test]
    fn unknown_anchor_is_a_parse_error() {
        let src = "[[binding]]\nliteral = \"a\"\nkey = \"A\"\nanchor = \"end\"\ntask = \"insert\"\n";
        assert!(matches!(parse_keymap(src), Err(KeymapError::Parse(_))));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(load_keymap(&path), Err(KeymapError::NotFound(p)) if p == path));
    }

    #[test]
    fn loads_from_disk() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), INDENT).unwrap();
        assert_eq!(load_keymap(tmp.path()).unwrap().len(), 2);
    }
}
