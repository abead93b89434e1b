//! Committed text of the chat input box, shared between the UI and dictation.

use std::sync::{Arc, Mutex, MutexGuard};

/// Clonable handle to the committed input text.
#[derive(Debug, Clone, Default)]
pub struct InputBuffer {
    text: Arc<Mutex<String>>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        self.text.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current committed text.
    pub fn text(&self) -> String {
        self.lock().clone()
    }

    /// Replace the whole buffer (typed input).
    pub fn set(&self, text: impl Into<String>) {
        *self.lock() = text.into();
    }

    /// Append a transcript segment, separated by one space when the buffer
    /// already holds text.
    pub fn append_segment(&self, segment: &str) {
        let segment = segment.trim();
        if segment.is_empty() {
            return;
        }
        let mut text = self.lock();
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(segment);
    }

    /// Take the committed text, leaving the buffer empty.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
