//! In-crate test host: applies plugin mutations immediately.

use crate::{Callback, CallbackId, EventBus, PluginApi, invoke};
use core_events::KeyCode;
use core_text::TextBuffer;
use std::collections::VecDeque;

pub(crate) struct RecordingApi {
    pub buffer: TextBuffer,
    pub bus: EventBus,
    pub list_view: Vec<String>,
    pub answers: VecDeque<Option<String>>,
    pub highlights: Vec<(usize, usize)>,
    pub locale: String,
}

impl Default for RecordingApi {
    fn default() -> Self {
        Self {
            buffer: TextBuffer::new(),
            bus: EventBus::new(),
            list_view: Vec::new(),
            answers: VecDeque::new(),
            highlights: Vec::new(),
            locale: "en-US".to_string(),
        }
    }
}

impl RecordingApi {
    pub fn with_text(text: &str, caret: usize) -> Self {
        let mut api = Self::default();
        api.buffer.set_text(text);
        api.buffer.set_caret(caret).unwrap();
        api
    }

    pub fn press_button(&mut self, name: &str) {
        for d in self.bus.button_dispatches(name) {
            invoke(&d, self);
        }
    }

    pub fn press_key(&mut self, key: KeyCode) {
        for d in self.bus.key_dispatches(key) {
            invoke(&d, self);
        }
    }

    /// Insert `c` at the caret, run text-change dispatch, then advance the caret.
    pub fn type_char(&mut self, c: char) {
        let at = self.buffer.caret();
        self.buffer.insert(at, c.encode_utf8(&mut [0; 4])).unwrap();
        for d in self.bus.text_change_dispatches(&self.buffer) {
            invoke(&d, self);
        }
        if self.buffer.caret() == at {
            self.buffer.set_caret(at + 1).unwrap();
        }
    }
}

impl PluginApi for RecordingApi {
    fn add_button(&mut self, name: &str, callback: Callback) -> CallbackId {
        self.bus.register_button(name, callback)
    }
    fn highlight_text(&mut self, start: usize, end: usize) {
        self.highlights.push((start, end));
        let end = end.min(self.buffer.len_chars());
        let _ = self.buffer.select(start.min(end)..end);
    }
    fn show_dialog(&mut self) -> Option<String> {
        self.answers.pop_front().flatten()
    }
    fn caret_position(&self) -> usize {
        self.buffer.caret()
    }
    fn set_caret_position(&mut self, index: usize) {
        let _ = self.buffer.set_caret(index);
    }
    fn text(&self) -> String {
        self.buffer.text()
    }
    fn set_text(&mut self, text: &str) {
        self.buffer.set_text(text);
    }
    fn locale(&self) -> &str {
        &self.locale
    }
    fn display_in_list_view(&mut self, name: &str) {
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
