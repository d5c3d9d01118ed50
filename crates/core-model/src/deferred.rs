//! Plugin mutations waiting to be applied on the owning flow.

use crossbeam_channel::{Receiver, Sender, TrySendError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredOp {
    SetText(String),
    SetCaret(usize),
    Highlight { start: usize, end: usize },
}

/// Submits [`DeferredOp`]s from any thread. The model applies them on its
/// next [`pump_remote`](crate::EditorModel::pump_remote).
#[derive(Debug, Clone)]
pub struct RemoteHandle {
    tx: Sender<DeferredOp>,
}

impl RemoteHandle {
    pub(crate) fn channel() -> (Self, Receiver<DeferredOp>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }

    /// Returns `false` once the model has been dropped.
    pub fn submit(&self, op: DeferredOp) -> bool {
        match self.tx.try_send(op) {
            Ok(()) => true,
            Err(TrySendError::Disconnected(_)) | Err(TrySendError::Full(_)) => false,
        }
    }

    pub fn set_text(&self, text: impl Into<String>) -> bool {
        self.submit(DeferredOp::SetText(text.into()))
    }

    pub fn set_caret(&self, index: usize) -> bool {
        self.submit(DeferredOp::SetCaret(index))
    }

    pub fn highlight(&self, start: usize, end: usize) -> bool {
        self.submit(DeferredOp::Highlight { start, end })
    }
}
