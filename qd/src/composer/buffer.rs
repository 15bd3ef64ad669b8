//! PromptComposer - accumulates keystrokes into a prompt

use std::sync::Arc;

use tracing::debug;

use super::template::{InstructionContext, InstructionTemplate};
use super::{ComposerError, LineCount, PromptSnapshot};

/// Keystroke buffer plus the structured parameters picked on the surface
///
/// The buffer only holds what the composer has been shown. A keyboard
/// extension sees the text typed since it gained focus, so an empty or
/// partial buffer is a normal starting point.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    buffer: String,
    topic: Option<String>,
    line_count: Option<LineCount>,
    style: Option<String>,
    template: Arc<InstructionTemplate>,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptComposer {
    pub fn new() -> Self {
        Self::with_template(Arc::new(InstructionTemplate::embedded()))
    }

    pub fn with_template(template: Arc<InstructionTemplate>) -> Self {
        Self {
            buffer: String::new(),
            topic: None,
            line_count: None,
            style: None,
            template,
        }
    }

    /// Seed the buffer with whatever context the host exposes
    pub fn from_context(context: &str, template: Arc<InstructionTemplate>) -> Self {
        debug!(len = context.len(), "PromptComposer::from_context: called");
        let mut composer = Self::with_template(template);
        composer.buffer.push_str(context);
        composer
    }

    pub fn append_char(&mut self, c: char) {
        self.buffer.push(c);
    }

    pub fn insert_space(&mut self) {
        self.buffer.push(' ');
    }

    /// Remove the last character; no-op on an empty buffer
    pub fn delete_last(&mut self) -> Option<char> {
        self.buffer.pop()
    }

    /// Set the topic; blank clears it
    pub fn set_topic(&mut self, topic: impl Into<String>) {
        let topic = topic.into();
        let topic = topic.trim();
        self.topic = (!topic.is_empty()).then(|| topic.to_string());
    }

    pub fn clear_topic(&mut self) {
        self.topic = None;
    }

    pub fn set_line_count(&mut self, count: u8) -> Result<(), ComposerError> {
        self.line_count = Some(LineCount::new(count)?);
        Ok(())
    }

    pub fn clear_line_count(&mut self) {
        self.line_count = None;
    }

    /// Set the style; blank clears it
    pub fn set_style(&mut self, style: impl Into<String>) {
        let style = style.into();
        let style = style.trim();
        self.style = (!style.is_empty()).then(|| style.to_string());
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn line_count(&self) -> Option<LineCount> {
        self.line_count
    }

    /// Drop typed text and parameters
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.topic = None;
        self.line_count = None;
        self.style = None;
    }

    /// Capture the current state; no side effects
    pub fn snapshot(&self) -> PromptSnapshot {
        let mut snapshot = PromptSnapshot {
            raw_text: self.buffer.clone(),
            topic: self.topic.clone(),
            line_count: self.line_count,
            style: self.style.clone(),
            instruction: String::new(),
        };

        if let Some(subject) = snapshot.subject() {
            let topic_is_subject = snapshot.raw_text.trim().is_empty();
            let ctx = InstructionContext {
                subject: subject.to_string(),
                line_count: self.line_count.map(LineCount::get),
                topic: if topic_is_subject { None } else { self.topic.clone() },
                style: self.style.clone(),
            };
            snapshot.instruction = self.template.render(&ctx);
        }

        debug!(instruction = %snapshot.instruction, "snapshot: captured");
        snapshot
    }
}
