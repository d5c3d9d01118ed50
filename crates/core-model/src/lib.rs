//! Editor model: the single owner of the text buffer.
//!
//! `EditorModel` ties together the pieces that must agree on character
//! offsets: the [`TextBuffer`], the key-combination engine and the extension
//! event bus. Every host signal goes through [`EditorModel::handle`]; nothing
//! else mutates the buffer.
//!
//! Core invariants (must hold after every public call):
//! * Caret and selection bounds are valid indices into the current text.
//! * The deferred queue is empty. Plugin mutations requested during a
//!   dispatch are applied before `handle` returns, in request order.
//! * A failing or panicking callback has not stopped the remaining callbacks.
//!
//! Ordering for one typed character (`InputEvent::TextCommit`):
//! 1. insert at the caret (caret stays before the new char),
//! 2. text-change dispatch (`caret + 1` is the index just past it),
//! 3. advance the caret,
//! 4. drain deferred plugin operations.
//!
//! Key presses run matching key-binding rules first (each one followed by
//! text-change dispatch if it edited the buffer), then plugin key callbacks.
//!
//! Operations submitted from other threads arrive through a [`RemoteHandle`]
//! and are applied by [`EditorModel::pump_remote`], normally on each tick.

use core_config::{Config, KeymapError, load_keymap};
use core_events::{CommandEvent, Event, InputEvent, KEYPRESS_TOTAL, KeyCode, KeyEvent};
use core_keymap::{EditOutcome, KeyComboEngine, KeyRule, place_caret};
use core_plugin::{
    Callback, CallbackId, CallbackStatus, Dispatch, EventBus, LoadReport, PluginApi, PluginHost,
    descriptor, invoke, start_plugin,
};
use core_text::TextBuffer;
use crossbeam_channel::Receiver;
use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

mod deferred;
mod dialog;

pub use deferred::{DeferredOp, RemoteHandle};
pub use dialog::{CancelDialog, DialogProvider};

pub const DEFAULT_DEFERRED_BUDGET: usize = 1024;

/// What the host loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct EditorModel {
    buffer: TextBuffer,
    engine: KeyComboEngine,
    bus: EventBus,
    deferred: VecDeque<DeferredOp>,
    deferred_budget: usize,
    remote: RemoteHandle,
    remote_rx: Receiver<DeferredOp>,
    dialog: Box<dyn DialogProvider>,
    pending_answers: VecDeque<Option<String>>,
    locale: String,
    list_view: Vec<String>,
    callback_failures: u64,
}

impl std::fmt::Debug for EditorModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorModel")
            .field("buffer", &self.buffer)
            .field("rules", &self.engine.rules().len())
            .field("callbacks", &self.bus.len())
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}

impl EditorModel {
    pub fn new(buffer: TextBuffer, rules: Vec<KeyRule>) -> Self {
        let (remote, remote_rx) = RemoteHandle::channel();
        Self {
            buffer,
            engine: KeyComboEngine::new(rules),
            bus: EventBus::new(),
            deferred: VecDeque::new(),
            deferred_budget: DEFAULT_DEFERRED_BUDGET,
            remote,
            remote_rx,
            dialog: Box::new(CancelDialog),
            pending_answers: VecDeque::new(),
            locale: "en-US".to_string(),
            list_view: Vec::new(),
            callback_failures: 0,
        }
    }

    /// Build from configuration: locale, deferred budget and key-binding rules.
    /// An unavailable rule source leaves the engine empty.
    pub fn configured(buffer: TextBuffer, config: &Config) -> Self {
        Self::new(buffer, Vec::new())
            .with_locale(config.locale())
            .with_deferred_budget(config.deferred_budget())
            .with_keymap_source(load_keymap(&config.keymap_path()))
    }

    pub fn with_keymap_source(mut self, source: Result<Vec<KeyRule>, KeymapError>) -> Self {
        match source {
            Ok(rules) => {
                info!(target: "model", rules = rules.len(), "keymap_installed");
                self.engine = KeyComboEngine::new(rules);
            }
            Err(err) => {
                warn!(target: "model", error = %err, "keymap_unavailable");
                self.engine = KeyComboEngine::empty();
            }
        }
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_dialog(mut self, dialog: impl DialogProvider + 'static) -> Self {
        self.dialog = Box::new(dialog);
        self
    }

    pub fn with_deferred_budget(mut self, budget: usize) -> Self {
        self.deferred_budget = budget;
        self
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn engine(&self) -> &KeyComboEngine {
        &self.engine
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Plugin names announced through `display_in_list_view`, in order.
    pub fn list_view(&self) -> &[String] {
        &self.list_view
    }

    pub fn callback_failures(&self) -> u64 {
        self.callback_failures
    }

    pub fn remote_handle(&self) -> RemoteHandle {
        self.remote.clone()
    }

    /// Start plugins through `host`, then apply whatever they queued.
    pub fn load_plugins(&mut self, host: &mut dyn PluginHost) -> anyhow::Result<LoadReport> {
        let report = host.load_all(self)?;
        self.drain_deferred();
        Ok(report)
    }

    /// Apply one host signal.
    pub fn handle(&mut self, event: Event) -> Flow {
        match event {
            Event::Input(InputEvent::Key(key)) => self.on_key(key),
            Event::Input(InputEvent::TextCommit(text)) => self.on_text_commit(&text),
            Event::Input(InputEvent::MoveCaret(index)) => {
                if let Err(err) = self.buffer.set_caret(index) {
                    debug!(target: "model", error = %err, "move_caret_rejected");
                }
            }
            Event::Input(InputEvent::Select { start, end }) => {
                if let Err(err) = self.buffer.select(start..end) {
                    debug!(target: "model", error = %err, "select_rejected");
                }
            }
            Event::ButtonPressed(name) => {
                let dispatches = self.bus.button_dispatches(&name);
                if dispatches.is_empty() {
                    debug!(target: "model", button = name.as_str(), "button_unbound");
                }
                self.run(dispatches);
                self.drain_deferred();
            }
            Event::Command(CommandEvent::LoadPlugin(id)) => self.load_one(&id),
            Event::Command(CommandEvent::DialogResponse(answer)) => {
                self.pending_answers.push_back(answer);
            }
            Event::Command(CommandEvent::Quit) | Event::Shutdown => return Flow::Quit,
            Event::Tick => {
                self.pump_remote();
            }
        }
        Flow::Continue
    }

    /// Apply operations submitted through [`RemoteHandle`]s. Returns how many arrived.
    pub fn pump_remote(&mut self) -> usize {
        let before = self.deferred.len();
        self.deferred.extend(self.remote_rx.try_iter());
        let arrived = self.deferred.len() - before;
        if arrived > 0 {
            debug!(target: "model", arrived, "remote_ops");
            self.drain_deferred();
        }
        arrived
    }

    fn on_key(&mut self, key: KeyEvent) {
        KEYPRESS_TOTAL.fetch_add(1, Ordering::Relaxed);
        for index in self.engine.matching(&key) {
            // Text-change dispatch sees the caret where the edit left it, before
            // the rule's own caret placement, matching typed input.
            let outcome = match self.engine.edit(index, &mut self.buffer) {
                Ok(caret) => {
                    self.dispatch_text_change();
                    place_caret(&mut self.buffer, caret)
                }
                Err(reason) => EditOutcome::Skipped(reason),
            };
            if let EditOutcome::Skipped(reason) = outcome {
                debug!(target: "model", rule = index, ?reason, "rule_skipped");
            }
        }
        let dispatches = self.bus.key_dispatches(key.code);
        self.run(dispatches);
        self.drain_deferred();
    }

    fn on_text_commit(&mut self, text: &str) {
        let mut utf8 = [0u8; 4];
        for c in text.chars() {
            let at = self.buffer.caret();
            if let Err(err) = self.buffer.insert(at, c.encode_utf8(&mut utf8)) {
                warn!(target: "model", error = %err, "typed_insert_rejected");
                continue;
            }
            self.dispatch_text_change();
            if let Err(err) = self.buffer.set_caret(at + 1) {
                debug!(target: "model", error = %err, "typed_caret_advance_rejected");
            }
            self.drain_deferred();
        }
    }

    fn load_one(&mut self, id: &str) {
        let Some(desc) = descriptor(id) else {
            warn!(target: "model", id, "unknown_plugin");
            return;
        };
        if let Err(err) = start_plugin(desc, self) {
            warn!(target: "model", id, error = %err, "plugin_load_failed");
        }
        self.drain_deferred();
    }

    fn dispatch_text_change(&mut self) {
        let dispatches = self.bus.text_change_dispatches(&self.buffer);
        self.run(dispatches);
    }

    fn run(&mut self, dispatches: Vec<Dispatch>) {
        for dispatch in &dispatches {
            if invoke(dispatch, self) != CallbackStatus::Completed {
                self.callback_failures += 1;
            }
        }
    }

    /// Apply queued plugin operations in order. Text changes re-run text-change
    /// dispatch, which may queue more; the budget caps one drain.
    fn drain_deferred(&mut self) {
        let mut applied = 0usize;
        while let Some(op) = self.deferred.pop_front() {
            if applied == self.deferred_budget {
                warn!(
                    target: "model",
                    budget = self.deferred_budget,
                    dropped = self.deferred.len() + 1,
                    "deferred_budget_exhausted"
                );
                self.deferred.clear();
                break;
            }
            applied += 1;
            self.apply(op);
        }
    }

    fn apply(&mut self, op: DeferredOp) {
        match op {
            DeferredOp::SetText(text) => {
                let revision = self.buffer.revision();
                self.buffer.set_text(&text);
                if self.buffer.revision() != revision {
                    self.dispatch_text_change();
                }
            }
            DeferredOp::SetCaret(index) => {
                if let Err(err) = self.buffer.set_caret(index) {
                    debug!(target: "model", error = %err, "plugin_caret_rejected");
                }
            }
            DeferredOp::Highlight { start, end } => {
                let end = end.min(self.buffer.len_chars());
                let start = start.min(end);
                if let Err(err) = self.buffer.select(start..end) {
                    debug!(target: "model", error = %err, "highlight_rejected");
                }
            }
        }
    }
}

impl PluginApi for EditorModel {
    fn add_button(&mut self, name: &str, callback: Callback) -> CallbackId {
        self.bus.register_button(name, callback)
    }

    fn highlight_text(&mut self, start: usize, end: usize) {
        self.deferred.push_back(DeferredOp::Highlight { start, end });
    }

    fn show_dialog(&mut self) -> Option<String> {
        match self.pending_answers.pop_front() {
            Some(answer) => answer,
            None => self.dialog.prompt(),
        }
    }

    fn caret_position(&self) -> usize {
        self.buffer.caret()
    }

    fn set_caret_position(&mut self, index: usize) {
        self.deferred.push_back(DeferredOp::SetCaret(index));
    }

    fn text(&self) -> String {
        self.buffer.text()
    }

    fn set_text(&mut self, text: &str) {
        self.deferred.push_back(DeferredOp::SetText(text.to_string()));
    }

    fn locale(&self) -> &str {
        &self.locale
    }

    fn display_in_list_view(&mut self, name: &str) {
        info!(target: "model", plugin = name, "plugin_listed");
        self.list_view.push(name.to_string());
    }

    fn add_key_press_callback(&mut self, key: KeyCode, callback: Callback) -> CallbackId {
        self.bus.register_key(key, callback)
    }

    fn add_text_change_callback(&mut self, detect: &str, callback: Callback) -> CallbackId {
        self.bus.register_text_change(detect, callback)
    }

    fn remove_callback(&mut self, id: CallbackId) -> bool {
        self.bus.unregister(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_plugin::callback;
    use pretty_assertions::assert_eq;

    fn model(text: &str, caret: usize) -> EditorModel {
        let mut buffer = TextBuffer::from_str(text);
        buffer.set_caret(caret).unwrap();
        EditorModel::new(buffer, Vec::new())
    }

    #[test]
    fn plugin_reads_see_pre_mutation_state_until_drain() {
        let mut m = model("abc", 0);
        m.add_button(
            "Peek",
            callback(|api, _| {
                api.set_text("xyz");
                anyhow::ensure!(api.text() == "abc", "write leaked into read");
                Ok(())
            }),
        );
        m.handle(Event::ButtonPressed("Peek".into()));
        assert_eq!(m.buffer().text(), "xyz");
        assert_eq!(m.callback_failures(), 0);
    }

    #[test]
    fn highlight_is_clamped_and_moves_caret_to_end() {
        let mut m = model("hello", 0);
        m.highlight_text(3, 99);
        m.drain_deferred();
        let sel = m.buffer().selection().unwrap();
        assert_eq!(sel.range(), 3..5);
        assert_eq!(m.buffer().caret(), 5);
        m.highlight_text(9, 2);
        m.drain_deferred();
        assert_eq!(m.buffer().selection().unwrap().range(), 2..2);
    }

    #[test]
    fn ping_pong_is_bounded_by_budget() {
        let mut m = model("", 0).with_deferred_budget(8);
        // "a" rewrites to "b" and "b" back to "a", forever.
        m.add_text_change_callback(
            "a",
            callback(|api, _| {
                api.set_text("b");
                Ok(())
            }),
        );
        m.add_text_change_callback(
            "b",
            callback(|api, _| {
                api.set_text("a");
                Ok(())
            }),
        );
        m.add_button(
            "Go",
            callback(|api, _| {
                api.set_text("a");
                Ok(())
            }),
        );
        m.handle(Event::ButtonPressed("Go".into()));
        assert!(m.deferred.is_empty());
        // Eight ops applied, alternating from "a".
        assert_eq!(m.buffer().text(), "b");
    }

    #[test]
    fn dialog_answers_queue_ahead_of_provider() {
        let mut m = model("", 0).with_dialog(|| Some("from provider".to_string()));
        m.handle(Event::Command(CommandEvent::DialogResponse(None)));
        m.handle(Event::Command(CommandEvent::DialogResponse(Some("queued".into()))));
        assert_eq!(m.show_dialog(), None);
        assert_eq!(m.show_dialog(), Some("queued".into()));
        assert_eq!(m.show_dialog(), Some("from provider".into()));
    }

    #[test]
    fn quit_and_shutdown_stop_the_loop() {
        let mut m = model("", 0);
        assert_eq!(m.handle(Event::Tick), Flow::Continue);
        assert_eq!(m.handle(Event::Command(CommandEvent::Quit)), Flow::Quit);
        assert_eq!(m.handle(Event::Shutdown), Flow::Quit);
    }
}
