//! Core event types and channel helpers for quill.
//!
//! Host signals (key presses, button presses, typed text, caret moves) are
//! normalized into [`Event`] values. The headless host pushes them through a
//! bounded tokio channel fed by [`AsyncEventSource`]s; the editor model
//! consumes them one at a time on the owning task.

use std::sync::atomic::AtomicU64;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

pub mod key;

pub use key::{KeyCode, KeyEvent, KeyModifiers, KeyParseError};

// -------------------------------------------------------------------------------------------------
// Channel Policy
// -------------------------------------------------------------------------------------------------
// Sources use `send(..).await` on a bounded channel so a slow consumer applies backpressure rather
// than dropping input. Edit fidelity matters more than latency for scripted replay.
// -------------------------------------------------------------------------------------------------
pub const EVENT_CHANNEL_CAP: usize = 8192;

pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static KEYPRESS_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Top-level event enum consumed by the central event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Input(InputEvent),
    /// A plugin-contributed button was pressed (payload: button name).
    ButtonPressed(String),
    Command(CommandEvent),
    /// Periodic tick used to pump operations submitted from other threads.
    Tick,
    Shutdown,
}

/// Input signals that touch the text buffer or caret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Raw key press with modifier state.
    Key(KeyEvent),
    /// Characters typed into the buffer at the caret.
    TextCommit(String),
    /// Caret placed by the host (mouse click, navigation).
    MoveCaret(usize),
    /// Host selection.
    Select { start: usize, end: usize },
}

/// Host-level commands that do not go through the editor model directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
    /// Start a built-in plugin by descriptor id.
    LoadPlugin(String),
    /// Queue the next free-text dialog answer (`None` = user cancelled).
    DialogResponse(Option<String>),
    Quit,
}

// -------------------------------------------------------------------------------------------------
// Async Event Sources
// -------------------------------------------------------------------------------------------------

/// Trait implemented by any async event producer. Implementors usually hold configuration and
/// spawn one background task that pushes `Event`s into the shared channel.
///
/// Each source remains independent and failure-isolated; it must stop promptly once
/// `tx.send(..).await` fails (consumer dropped).
pub trait AsyncEventSource: Send + 'static {
    /// Human-readable stable identifier (used for logging / diagnostics).
    fn name(&self) -> &'static str;
    /// Consume self and spawn the background task, returning a JoinHandle.
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Registry of event sources spawned together at startup.
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl Default for EventSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Spawn all registered sources, returning their JoinHandles. Each source receives its own
    /// `Sender` clone; drop the caller's final clone before awaiting the handles during shutdown
    /// so sources observe the closed channel and exit cooperatively.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        // Drain so duplicate spawns are prevented if called twice.
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            let name = src.name();
            tracing::info!(target: "runtime.events", source = name, "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}

/// Built-in monotonic tick source. Emits `Event::Tick` every configured interval.
pub struct TickEventSource {
    interval: std::time::Duration,
}

impl TickEventSource {
    pub fn new(interval: std::time::Duration) -> Self {
        Self { interval }
    }
}

impl AsyncEventSource for TickEventSource {
    fn name(&self) -> &'static str {
        "tick"
    }
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let dur = self.interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(dur);
            loop {
                interval.tick().await;
                if tx.send(Event::Tick).await.is_err() {
                    break;
                }
            }
        })
    }
}

/// Helper result type for channel plumbing.
pub type EventResult<T> = anyhow::Result<T>;
