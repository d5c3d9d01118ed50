//! Plugin-facing API surface, callback registries and the compiled-in plugin table.
//!
//! Plugins never see the editor model directly. They receive a
//! `&mut dyn PluginApi` in `start` and in every callback, read the buffer
//! through it, and request edits through it. The editor model is the only
//! implementor in the workspace.
//!
//! Design Notes:
//! - Callbacks are `Rc<dyn Fn>`: they run synchronously on the owning flow,
//!   so nothing here needs `Send`. Code on another thread submits edits via the
//!   model's remote handle instead.
//! - Registration is immediate. Dispatch iterates a snapshot of the matching
//!   entries, so a callback may register or remove callbacks mid-dispatch.
//! - A failing callback (error or panic) is contained by [`bus::invoke`] and
//!   never stops dispatch to the remaining callbacks.
//! - Plugin discovery is a static descriptor table ([`host::BUILTIN_PLUGINS`])
//!   rather than runtime lookup; `StaticPluginHost` starts the enabled ones.

use core_events::KeyCode;
use std::fmt;
use std::rc::Rc;

pub mod builtin;
pub mod bus;
pub mod host;
#[cfg(test)]
mod testing;

pub use bus::{CallbackStatus, Dispatch, EventBus, invoke};
pub use host::{
    BUILTIN_PLUGINS, LoadReport, Plugin, PluginDescriptor, PluginHost, StaticPluginHost,
    descriptor, start_plugin,
};

/// Stable handle returned by every registration; used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(pub(crate) u64);

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cb#{}", self.0)
    }
}

/// What caused a callback to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginEvent {
    Button { name: String },
    Key { key: KeyCode },
    TextDetected { detect: String },
}

pub type CallbackResult = anyhow::Result<()>;

pub type Callback = Rc<dyn Fn(&mut dyn PluginApi, &PluginEvent) -> CallbackResult>;

/// Wrap a closure as a [`Callback`].
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(&mut dyn PluginApi, &PluginEvent) -> CallbackResult + 'static,
{
    Rc::new(f)
}

/// Operations a plugin may perform against the host editor.
///
/// Reads reflect the buffer as it is right now. Mutations (`set_text`,
/// `set_caret_position`, `highlight_text`) are applied by the host after the
/// current dispatch completes, in request order; a read issued after a
/// mutation request inside the same callback still sees the old state.
pub trait PluginApi {
    /// Add a host button named `name` whose presses invoke `callback`.
    fn add_button(&mut self, name: &str, callback: Callback) -> CallbackId;
    /// Select original-text chars `[start, end)`.
    fn highlight_text(&mut self, start: usize, end: usize);
    /// Prompt the user for free text; `None` when cancelled.
    fn show_dialog(&mut self) -> Option<String>;
    fn caret_position(&self) -> usize;
    fn set_caret_position(&mut self, index: usize);
    fn text(&self) -> String;
    fn set_text(&mut self, text: &str);
    /// BCP-47 tag of the editor locale (e.g. `en-US`).
    fn locale(&self) -> &str;
    /// Announce the plugin in the host's plugin list.
    fn display_in_list_view(&mut self, name: &str);
    fn add_key_press_callback(&mut self, key: KeyCode, callback: Callback) -> CallbackId;
    /// Fire `callback` whenever `detect` is the text just typed before the caret.
    fn add_text_change_callback(&mut self, detect: &str, callback: Callback) -> CallbackId;
    /// Remove a registration made through any of the `add_*` calls.
    fn remove_callback(&mut self, id: CallbackId) -> bool;
}
