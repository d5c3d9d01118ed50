//! Immutable key-combination rules and the records they are built from.

use core_events::{KeyCode, KeyEvent, KeyModifiers, KeyParseError};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Insert,
    Delete,
}

/// Where a rule's edit is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Anchor {
    #[serde(rename = "start", alias = "@start")]
    LineStart,
    #[serde(rename = "caret", alias = "@caret")]
    Caret,
}

/// One record as delivered by the key-binding source (already tokenized).
///
/// Modifier fields default to `false` so a record only names the modifiers
/// that must be held.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuleRecord {
    pub literal: String,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    pub key: String,
    pub anchor: Anchor,
    pub task: Task,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule key: {0}")]
    Key(#[from] KeyParseError),
}

/// A parsed key binding. Each modifier flag must match the held state exactly,
/// including when it is `false` (modifier must be absent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRule {
    literal: String,
    literal_len: usize,
    alt: bool,
    ctrl: bool,
    shift: bool,
    key: KeyCode,
    task: Task,
    anchor: Anchor,
}

impl KeyRule {
    pub fn new(
        literal: impl Into<String>,
        mods: KeyModifiers,
        key: KeyCode,
        task: Task,
        anchor: Anchor,
    ) -> Self {
        let literal = literal.into();
        Self {
            literal_len: literal.chars().count(),
            literal,
            alt: mods.contains(KeyModifiers::ALT),
            ctrl: mods.contains(KeyModifiers::CTRL),
            shift: mods.contains(KeyModifiers::SHIFT),
            key,
            task,
            anchor,
        }
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// Literal length in chars (the unit all buffer offsets use).
    pub fn literal_len(&self) -> usize {
        self.literal_len
    }

    pub fn key(&self) -> KeyCode {
        self.key
    }

    pub fn task(&self) -> Task {
        self.task
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn modifiers(&self) -> KeyModifiers {
        KeyModifiers::from_held(self.alt, self.ctrl, self.shift)
    }

    /// Exact match on all three modifier flags and the key identifier.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.alt == event.mods.contains(KeyModifiers::ALT)
            && self.ctrl == event.mods.contains(KeyModifiers::CTRL)
            && self.shift == event.mods.contains(KeyModifiers::SHIFT)
            && self.key == event.code
    }
}

impl TryFrom<RuleRecord> for KeyRule {
    type Error = RuleError;

    fn try_from(rec: RuleRecord) -> Result<Self, Self::Error> {
        let key: KeyCode = rec.key.parse()?;
        Ok(KeyRule::new(
            rec.literal,
            KeyModifiers::from_held(rec.alt, rec.ctrl, rec.shift),
            key,
            rec.task,
            rec.anchor,
        ))
    }
}

impl fmt::Display for KeyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |on: bool, name: &'static str| if on { name } else { "-" };
        let task = match self.task {
            Task::Insert => "insert",
            Task::Delete => "delete",
        };
        let anchor = match self.anchor {
            Anchor::LineStart => "@start",
            Anchor::Caret => "@caret",
        };
        write!(
            f,
            "[{}, {}, {}, {}] {} {} {:?}",
            flag(self.alt, "alt"),
            flag(self.ctrl, "ctrl"),
            flag(self.shift, "shift"),
            self.key,
            task,
            anchor,
            self.literal
        )
    }
}
