//! Extension event bus: button, key and text-change registries.
//!
//! Each registry keeps registrations in arrival order. Matching produces an
//! owned snapshot ([`Dispatch`] values holding cloned `Rc`s), so the caller
//! can hand `&mut` access to the whole host (bus included) to each callback
//! while iterating.

use crate::{Callback, CallbackId, PluginApi, PluginEvent};
use core_events::KeyCode;
use core_text::TextBuffer;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, warn};

struct Entry<K> {
    id: CallbackId,
    key: K,
    callback: Callback,
}

/// One callback selected for an event.
#[derive(Clone)]
pub struct Dispatch {
    pub id: CallbackId,
    pub event: PluginEvent,
    callback: Callback,
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatch")
            .field("id", &self.id)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    buttons: Vec<Entry<String>>,
    keys: Vec<Entry<KeyCode>>,
    text_changes: Vec<Entry<String>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> CallbackId {
        self.next_id += 1;
        CallbackId(self.next_id)
    }

    pub fn register_button(&mut self, name: impl Into<String>, callback: Callback) -> CallbackId {
        let id = self.allocate();
        let name = name.into();
        debug!(target: "plugin.bus", %id, button = name.as_str(), "register_button");
        self.buttons.push(Entry {
            id,
            key: name,
            callback,
        });
        id
    }

    pub fn register_key(&mut self, key: KeyCode, callback: Callback) -> CallbackId {
        let id = self.allocate();
        debug!(target: "plugin.bus", %id, %key, "register_key");
        self.keys.push(Entry { id, key, callback });
        id
    }

    pub fn register_text_change(
        &mut self,
        detect: impl Into<String>,
        callback: Callback,
    ) -> CallbackId {
        let id = self.allocate();
        let detect = detect.into();
        debug!(target: "plugin.bus", %id, detect_len = detect.chars().count(), "register_text_change");
        self.text_changes.push(Entry {
            id,
            key: detect,
            callback,
        });
        id
    }

    /// Remove a registration from whichever registry holds it.
    pub fn unregister(&mut self, id: CallbackId) -> bool {
        let before = self.len();
        self.buttons.retain(|e| e.id != id);
        self.keys.retain(|e| e.id != id);
        self.text_changes.retain(|e| e.id != id);
        let removed = self.len() != before;
        debug!(target: "plugin.bus", %id, removed, "unregister");
        removed
    }

    pub fn len(&self) -> usize {
        self.buttons.len() + self.keys.len() + self.text_changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered button names in arrival order (duplicates kept).
    pub fn button_names(&self) -> impl Iterator<Item = &str> {
        self.buttons.iter().map(|e| e.key.as_str())
    }

    pub fn button_dispatches(&self, name: &str) -> Vec<Dispatch> {
        self.buttons
            .iter()
            .filter(|e| e.key == name)
            .map(|e| Dispatch {
                id: e.id,
                event: PluginEvent::Button {
                    name: e.key.clone(),
                },
                callback: e.callback.clone(),
            })
            .collect()
    }

    pub fn key_dispatches(&self, key: KeyCode) -> Vec<Dispatch> {
        self.keys
            .iter()
            .filter(|e| e.key == key)
            .map(|e| Dispatch {
                id: e.id,
                event: PluginEvent::Key { key: e.key },
                callback: e.callback.clone(),
            })
            .collect()
    }

    /// Registrations whose detect string equals the `len` chars ending at
    /// `caret + 1` (the char just typed sits at `caret`). Registrations whose
    /// window would leave the buffer are skipped; empty detect strings never match.
    pub fn text_change_dispatches(&self, buffer: &TextBuffer) -> Vec<Dispatch> {
        let caret_idx = buffer.caret() + 1;
        let text_len = buffer.len_chars();
        self.text_changes
            .iter()
            .filter(|e| {
                let len = e.key.chars().count();
                len > 0
                    && caret_idx >= len
                    && caret_idx <= text_len
                    && buffer.matches_at(caret_idx - len..caret_idx, &e.key)
            })
            .map(|e| Dispatch {
                id: e.id,
                event: PluginEvent::TextDetected {
                    detect: e.key.clone(),
                },
                callback: e.callback.clone(),
            })
            .collect()
    }
}

/// Outcome of one guarded callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackStatus {
    Completed,
    Failed(String),
    Panicked(String),
}

/// Run one callback, containing both `Err` returns and panics.
pub fn invoke(dispatch: &Dispatch, api: &mut dyn PluginApi) -> CallbackStatus {
    let result = catch_unwind(AssertUnwindSafe(|| {
        (dispatch.callback)(&mut *api, &dispatch.event)
    }));
    match result {
        Ok(Ok(())) => CallbackStatus::Completed,
        Ok(Err(err)) => {
            warn!(target: "plugin.bus", id = %dispatch.id, error = %err, "callback_failed");
            CallbackStatus::Failed(err.to_string())
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            warn!(target: "plugin.bus", id = %dispatch.id, panic = msg.as_str(), "callback_panicked");
            CallbackStatus::Panicked(msg)
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
