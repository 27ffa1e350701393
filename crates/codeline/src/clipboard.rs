//! Clipboard collaborator.

use crate::guarded::GuardedCell;

/// System clipboard access, supplied by the host.
pub trait Clipboard: Send + Sync {
    /// Current clipboard text, if the clipboard holds text.
    fn get_text(&self) -> Option<String>;
    /// Replace the clipboard content.
    fn set_data(&self, text: &str);
}

/// In-process clipboard; the default when the host supplies none.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    content: GuardedCell<Option<String>>,
}

impl MemoryClipboard {
    /// An empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for MemoryClipboard {
    fn get_text(&self) -> Option<String> {
        self.content.get()
    }

    fn set_data(&self, text: &str) {
        *self.content.lock() = Some(text.to_string());
    }
}
