/// The host's free-text prompt. `None` means the user cancelled.
pub trait DialogProvider {
    fn prompt(&mut self) -> Option<String>;
}

/// Provider for hosts without an interactive prompt: always cancelled.
#[derive(Debug, Default, Clone, Copy)]
pub struct CancelDialog;

impl DialogProvider for CancelDialog {
    fn prompt(&mut self) -> Option<String> {
        None
    }
}

impl<F> DialogProvider for F
where
    F: FnMut() -> Option<String>,
{
    fn prompt(&mut self) -> Option<String> {
        self()
    }
}
