//! Editable host document as seen through an input surface
//!
//! The cursor always sits at the end of the text. An optional marked region
//! is always a suffix of the text; typing commits it.

use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    text: String,
    /// Byte offset where the marked region starts
    marked_from: Option<usize>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marked_from: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text before the cursor; all a keyboard extension is allowed to see
    pub fn context_before_input(&self) -> &str {
        &self.text
    }

    pub fn marked_text(&self) -> Option<&str> {
        self.marked_from.map(|from| &self.text[from..])
    }

    /// Insert at the cursor, committing any marked region first
    pub fn insert_text(&mut self, text: &str) {
        self.marked_from = None;
        self.text.push_str(text);
    }

    /// Delete the character before the cursor
    pub fn delete_backward(&mut self) -> Option<char> {
        let removed = self.text.pop();
        if let Some(from) = self.marked_from
            && from >= self.text.len()
        {
            self.marked_from = None;
        }
        removed
    }

    /// Replace the marked region (or insert at the cursor) and mark the result
    pub fn set_marked_text(&mut self, text: &str) {
        debug!(len = text.len(), replacing = self.marked_from.is_some(), "set_marked_text: called");
        if let Some(from) = self.marked_from {
            self.text.truncate(from);
        }
        let from = self.text.len();
        self.text.push_str(text);
        self.marked_from = if text.is_empty() { None } else { Some(from) };
    }

    /// Accept the marked region as ordinary text
    pub fn commit_marked(&mut self) {
        self.marked_from = None;
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
