//! core-keymap: key-combination rules and the engine that applies them.
//!
//! Design principles:
//! - Pure dispatcher: no state beyond the immutable rule list.
//! - Every rule is tested against every key event in file order; all matches
//!   fire (no first-match-wins), each seeing the buffer left by the previous.
//! - Delete rules are guarded: the text they would remove must equal the
//!   literal exactly, otherwise the rule is skipped without mutation.
//! - Failures never surface to the host; outcomes are reported for logging and
//!   tests only.

use core_events::KeyEvent;
use core_text::TextBuffer;
use smallvec::SmallVec;
use tracing::{debug, trace};

pub mod rule;

pub use rule::{Anchor, KeyRule, RuleError, RuleRecord, Task};

/// Why a fired rule left the buffer untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Candidate region exists but its text differs from the literal.
    MismatchGuard,
    /// Candidate region would fall outside the buffer.
    OutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    Skipped(SkipReason),
}

/// A rule that matched an event, identified by its position in the rule list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub rule: usize,
    pub outcome: EditOutcome,
}

pub type FiredRules = SmallVec<[Fired; 4]>;

/// Matches live key state against the loaded rules and edits the buffer.
#[derive(Debug, Clone, Default)]
pub struct KeyComboEngine {
    rules: Vec<KeyRule>,
}

impl KeyComboEngine {
    pub fn new(rules: Vec<KeyRule>) -> Self {
        debug!(target: "keymap", rules = rules.len(), "engine_loaded");
        Self { rules }
    }

    /// Engine used when no rule source is available; every event is a no-op.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn rules(&self) -> &[KeyRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Indices of rules matching `event`, in rule order.
    pub fn matching(&self, event: &KeyEvent) -> SmallVec<[usize; 4]> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.matches(event))
            .map(|(i, _)| i)
            .collect()
    }

    /// Run every matching rule against `buffer`.
    pub fn dispatch(&self, event: &KeyEvent, buffer: &mut TextBuffer) -> FiredRules {
        self.matching(event)
            .into_iter()
            .map(|i| Fired {
                rule: i,
                outcome: self.apply(i, buffer),
            })
            .collect()
    }

    /// Apply rule `index` to `buffer`. Panics if `index` is out of bounds of the rule list.
    pub fn apply(&self, index: usize, buffer: &mut TextBuffer) -> EditOutcome {
        let outcome = match self.edit(index, buffer) {
            Ok(caret) => place_caret(buffer, caret),
            Err(reason) => EditOutcome::Skipped(reason),
        };
        debug!(
            target: "keymap",
            rule = index,
            key = %self.rules[index].key(),
            ?outcome,
            caret = buffer.caret(),
            "rule_fired"
        );
        outcome
    }

    /// Text phase of rule `index`: mutate `buffer` and return the pending caret
    /// placement for [`place_caret`]. Between the two the caret still sits where
    /// buffer gravity left it. Panics if `index` is out of bounds.
    pub fn edit(&self, index: usize, buffer: &mut TextBuffer) -> Result<CaretAfter, SkipReason> {
        let result = edit_rule(&self.rules[index], buffer);
        debug!(target: "keymap", rule = index, ?result, "rule_edit");
        result
    }
}

/// Caret placement owed by an applied edit. `None` keeps the gravity position.
pub type CaretAfter = Option<usize>;

/// Execute one rule's (task, anchor) edit, caret placement included.
pub fn apply_rule(rule: &KeyRule, buffer: &mut TextBuffer) -> EditOutcome {
    match edit_rule(rule, buffer) {
        Ok(caret) => place_caret(buffer, caret),
        Err(reason) => EditOutcome::Skipped(reason),
    }
}

/// Mutate the text for one rule without moving the caret past buffer gravity.
pub fn edit_rule(rule: &KeyRule, buffer: &mut TextBuffer) -> Result<CaretAfter, SkipReason> {
    let caret = buffer.caret();
    let len = rule.literal_len();
    match (rule.task(), rule.anchor()) {
        (Task::Insert, Anchor::Caret) => {
            insert_at(buffer, caret, rule.literal())?;
            Ok(Some(caret + len))
        }
        (Task::Insert, Anchor::LineStart) => {
            let start = buffer.line_start(caret);
            insert_at(buffer, start, rule.literal())?;
            // Caret keeps its distance from the text that follows the insert.
            Ok(Some(caret + len))
        }
        (Task::Delete, Anchor::Caret) => {
            let Some(start) = caret.checked_sub(len) else {
                trace!(target: "keymap", caret, len, "delete_caret_underflow");
                return Err(SkipReason::OutOfRange);
            };
            // Buffer gravity leaves the caret at `start`, adjacent to the same text.
            delete_guarded(buffer, start, rule.literal())?;
            Ok(None)
        }
        (Task::Delete, Anchor::LineStart) => {
            let start = buffer.line_start(caret);
            let target = caret.saturating_sub(len).max(start);
            delete_guarded(buffer, start, rule.literal())?;
            Ok(Some(target))
        }
    }
}

/// Caret phase of a rule edit.
pub fn place_caret(buffer: &mut TextBuffer, caret: CaretAfter) -> EditOutcome {
    match caret.map(|at| buffer.set_caret(at)) {
        Some(Err(_)) => EditOutcome::Skipped(SkipReason::OutOfRange),
        _ => EditOutcome::Applied,
    }
}

fn insert_at(buffer: &mut TextBuffer, at: usize, literal: &str) -> Result<(), SkipReason> {
    buffer
        .insert(at, literal)
        .map_err(|_| SkipReason::OutOfRange)
}

fn delete_guarded(buffer: &mut TextBuffer, start: usize, literal: &str) -> Result<(), SkipReason> {
    let end = start + literal.chars().count();
    if end > buffer.len_chars() {
        return Err(SkipReason::OutOfRange);
    }
    if !buffer.matches_at(start..end, literal) {
        return Err(SkipReason::MismatchGuard);
    }
    buffer
        .delete(start..end)
        .map(drop)
        .map_err(|_| SkipReason::OutOfRange)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::{KeyCode, KeyModifiers};
    use pretty_assertions::assert_eq;

    fn rule(lit: &str, mods: KeyModifiers, task: Task, anchor: Anchor) -> KeyRule {
        KeyRule::new(lit, mods, KeyCode::Char('D'), task, anchor)
    }

    fn ctrl_d() -> KeyEvent {
        KeyEvent::new(KeyCode::Char('D'), KeyModifiers::CTRL)
    }

    fn buffer_at(text: &str, caret: usize) -> TextBuffer {
        let mut b = TextBuffer::from_str(text);
        b.set_caret(caret).unwrap();
        b
    }

    #[test]
    fn insert_at_caret_advances_caret() {
        let engine = KeyComboEngine::new(vec![rule(
            "X",
            KeyModifiers::CTRL,
            Task::Insert,
            Anchor::Caret,
        )]);
        let mut b = buffer_at("ab", 1);
        let fired = engine.dispatch(&ctrl_d(), &mut b);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].outcome, EditOutcome::Applied);
        assert_eq!(b.text(), "aXb");
        assert_eq!(b.caret(), 2);
    }

    #[test]
    fn insert_at_line_start_without_newline_uses_index_zero() {
        let engine = KeyComboEngine::new(vec![rule(
            "// ",
            KeyModifiers::CTRL,
            Task::Insert,
            Anchor::LineStart,
        )]);
        let mut b = buffer_at("code", 0);
        engine.dispatch(&ctrl_d(), &mut b);
        assert_eq!(b.text(), "// code");
        assert_eq!(b.caret(), 3);

        let mut b = buffer_at("code", 2);
        engine.dispatch(&ctrl_d(), &mut b);
        assert_eq!(b.text(), "// code");
        assert_eq!(b.caret(), 5);
    }

    #[test]
    fn insert_at_line_start_of_later_line() {
        let engine = KeyComboEngine::new(vec![rule(
            "\t",
            KeyModifiers::CTRL,
            Task::Insert,
            Anchor::LineStart,
        )]);
        let mut b = buffer_at("one\ntwo", 6);
        engine.dispatch(&ctrl_d(), &mut b);
        assert_eq!(b.text(), "one\n\ttwo");
        assert_eq!(b.caret(), 7);
    }

    #[test]
    fn delete_at_caret_requires_exact_text_before_caret() {
        let engine = KeyComboEngine::new(vec![rule(
            "//",
            KeyModifiers::CTRL,
            Task::Delete,
            Anchor::Caret,
        )]);
        let mut b = buffer_at("ab//cd", 4);
        let fired = engine.dispatch(&ctrl_d(), &mut b);
        assert_eq!(fired[0].outcome, EditOutcome::Applied);
        assert_eq!(b.text(), "abcd");
        assert_eq!(b.caret(), 2);

        let mut b = buffer_at("ab/xcd", 4);
        let rev = b.revision();
        let fired = engine.dispatch(&ctrl_d(), &mut b);
        assert_eq!(
            fired[0].outcome,
            EditOutcome::Skipped(SkipReason::MismatchGuard)
        );
        assert_eq!(b.text(), "ab/xcd");
        assert_eq!(b.caret(), 4);
        assert_eq!(b.revision(), rev);
    }

    #[test]
    fn delete_at_caret_underflow_is_skipped() {
        let engine = KeyComboEngine::new(vec![rule(
            "abc",
            KeyModifiers::CTRL,
            Task::Delete,
            Anchor::Caret,
        )]);
        let mut b = buffer_at("abc", 2);
        let fired = engine.dispatch(&ctrl_d(), &mut b);
        assert_eq!(
            fired[0].outcome,
            EditOutcome::Skipped(SkipReason::OutOfRange)
        );
        assert_eq!(b.text(), "abc");
    }

    #[test]
    fn edit_phase_leaves_caret_before_inserted_text() {
        let engine = KeyComboEngine::new(vec![rule(
            "XY",
            KeyModifiers::CTRL,
            Task::Insert,
            Anchor::Caret,
        )]);
        let mut b = buffer_at("ab", 1);
        let pending = engine.edit(0, &mut b).unwrap();
        assert_eq!(b.text(), "aXYb");
        assert_eq!(b.caret(), 1);
        assert_eq!(pending, Some(3));
        assert_eq!(place_caret(&mut b, pending), EditOutcome::Applied);
        assert_eq!(b.caret(), 3);
    }

    #[test]
    fn edit_phase_reports_guard_without_mutation() {
        let engine = KeyComboEngine::new(vec![rule(
            "zz",
            KeyModifiers::CTRL,
            Task::Delete,
            Anchor::Caret,
        )]);
        let mut b = buffer_at("abcd", 4);
        assert_eq!(engine.edit(0, &mut b), Err(SkipReason::MismatchGuard));
        assert_eq!(b.text(), "abcd");
        assert_eq!(b.caret(), 4);
    }

    #[test]
    fn delete_at_line_start_moves_caret_back() {
        let engine = KeyComboEngine::new(vec![rule(
            "// ",
            KeyModifiers::CTRL,
            Task::Delete,
            Anchor::LineStart,
        )]);
        let mut b = buffer_at("x\n// code", 7);
        engine.dispatch(&ctrl_d(), &mut b);
        assert_eq!(b.text(), "x\ncode");
        assert_eq!(b.caret(), 4);
    }

    #[test]
    fn delete_at_line_start_caret_inside_literal_stays_on_line() {
        let engine = KeyComboEngine::new(vec![rule(
            "// ",
            KeyModifiers::CTRL,
            Task::Delete,
            Anchor::LineStart,
        )]);
        let mut b = buffer_at("x\n// code", 3);
        engine.dispatch(&ctrl_d(), &mut b);
        assert_eq!(b.text(), "x\ncode");
        assert_eq!(b.caret(), 2);
    }

    #[test]
    fn delete_at_line_start_mismatch_same_length_is_noop() {
        let engine = KeyComboEngine::new(vec![rule(
            "// ",
            KeyModifiers::CTRL,
            Task::Delete,
            Anchor::LineStart,
        )]);
        let mut b = buffer_at("#! code", 5);
        let fired = engine.dispatch(&ctrl_d(), &mut b);
        assert_eq!(
            fired[0].outcome,
            EditOutcome::Skipped(SkipReason::MismatchGuard)
        );
        assert_eq!(b.text(), "#! code");
        assert_eq!(b.caret(), 5);
    }

    #[test]
    fn modifiers_must_match_exactly() {
        let engine = KeyComboEngine::new(vec![rule(
            "X",
            KeyModifiers::CTRL,
            Task::Insert,
            Anchor::Caret,
        )]);
        let mut b = buffer_at("", 0);
        let extra = KeyEvent::new(KeyCode::Char('D'), KeyModifiers::CTRL | KeyModifiers::SHIFT);
        assert!(engine.dispatch(&extra, &mut b).is_empty());
        let missing = KeyEvent::plain(KeyCode::Char('D'));
        assert!(engine.dispatch(&missing, &mut b).is_empty());
        let other_key = KeyEvent::new(KeyCode::Char('E'), KeyModifiers::CTRL);
        assert!(engine.dispatch(&other_key, &mut b).is_empty());
        assert_eq!(b.text(), "");
    }

    #[test]
    fn all_matching_rules_fire_in_order() {
        let engine = KeyComboEngine::new(vec![
            rule("a", KeyModifiers::CTRL, Task::Insert, Anchor::Caret),
            rule("b", KeyModifiers::ALT, Task::Insert, Anchor::Caret),
            rule("c", KeyModifiers::CTRL, Task::Insert, Anchor::Caret),
            rule("ac", KeyModifiers::CTRL, Task::Delete, Anchor::Caret),
        ]);
        let mut b = buffer_at("", 0);
        let fired = engine.dispatch(&ctrl_d(), &mut b);
        let order: Vec<usize> = fired.iter().map(|f| f.rule).collect();
        assert_eq!(order, vec![0, 2, 3]);
        // insert a, insert c, then delete "ac" before the caret.
        assert_eq!(b.text(), "");
        assert_eq!(b.caret(), 0);
    }

    #[test]
    fn empty_engine_is_inert() {
        let engine = KeyComboEngine::empty();
        let mut b = buffer_at("abc", 1);
        assert!(engine.dispatch(&ctrl_d(), &mut b).is_empty());
        assert_eq!(b.text(), "abc");
    }
}
