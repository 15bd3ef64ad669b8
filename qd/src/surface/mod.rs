//! Surface Adapter
//!
//! Applies a finished generation to the live editing surface: a primary
//! [`Document`] the user is typing into and a preview pane beside it.
//! Failures only ever reach the preview.

mod document;
pub mod layout;

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

pub use document::Document;

use crate::generator::{ErrorKind, GenerationResult};
use crate::tracker::RequestId;

/// Shown while a request is outstanding
pub const PROGRESS_NOTICE: &str = "Generating poetic text...";

/// Shown when generate is pressed with nothing to send
pub const EMPTY_PROMPT_HINT: &str = "Please enter a keyword and line count, e.g., 'اشتياق للام عدد الابيات 5'";

/// Where a successful poem goes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyMode {
    /// Stage in the preview pane until the user pastes (keyboard)
    #[default]
    Preview,
    /// Replace the marked region of the document directly (wizard)
    Document,
}

/// Preview pane contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Preview {
    #[default]
    Empty,
    Progress,
    Poem(String),
    Diagnostic(String),
}

impl fmt::Display for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preview::Empty => Ok(()),
            Preview::Progress => write!(f, "{}", PROGRESS_NOTICE),
            Preview::Poem(text) | Preview::Diagnostic(text) => write!(f, "{}", text),
        }
    }
}

/// Human-readable message for a failure
pub fn diagnostic(kind: ErrorKind, message: &str) -> String {
    match kind {
        ErrorKind::Network => format!("Network error: {}", message),
        ErrorKind::Protocol => format!("Failed to generate poem: {}", message),
        ErrorKind::Empty => EMPTY_PROMPT_HINT.to_string(),
    }
}

/// Document plus preview for one input surface
#[derive(Debug, Clone, Default)]
pub struct TextSurface {
    document: Document,
    preview: Preview,
    mode: ApplyMode,
    expected: Option<RequestId>,
}

impl TextSurface {
    pub fn new(mode: ApplyMode) -> Self {
        debug!(?mode, "TextSurface::new: called");
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_document(mode: ApplyMode, document: Document) -> Self {
        Self {
            document,
            ..Self::new(mode)
        }
    }

    pub fn mode(&self) -> ApplyMode {
        self.mode
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    /// Latest id this surface will accept a result for
    pub fn expected(&self) -> Option<RequestId> {
        self.expected
    }

    pub fn expect(&mut self, id: RequestId) {
        debug!(%id, "expect: called");
        self.expected = Some(id);
    }

    pub fn show_progress(&mut self) {
        self.preview = Preview::Progress;
    }

    /// Apply a result; returns false when `id` is not the expected request
    pub fn apply_result(&mut self, id: RequestId, result: &GenerationResult) -> bool {
        if self.expected != Some(id) {
            warn!(%id, expected = ?self.expected, "apply_result: rejecting result for unexpected request");
            return false;
        }
        self.expected = None;

        match result {
            GenerationResult::Success { text } => {
                match self.mode {
                    ApplyMode::Preview => self.preview = Preview::Poem(text.clone()),
                    ApplyMode::Document => {
                        self.document.set_marked_text(text);
                        self.preview = Preview::Empty;
                    }
                }
                info!(%id, mode = ?self.mode, len = text.len(), "Applied poem");
            }
            GenerationResult::Failure { kind, message } => {
                self.show_diagnostic(*kind, message);
                info!(%id, %kind, "Applied failure diagnostic");
            }
        }
        true
    }

    pub fn show_diagnostic(&mut self, kind: ErrorKind, message: &str) {
        self.preview = Preview::Diagnostic(diagnostic(kind, message));
    }

    /// Move a staged poem into the document as marked text
    pub fn paste(&mut self) -> bool {
        match std::mem::take(&mut self.preview) {
            Preview::Poem(text) => {
                debug!(len = text.len(), "paste: moving preview into document");
                self.document.set_marked_text(&text);
                true
            }
            other => {
                debug!(preview = ?other, "paste: nothing to paste");
                self.preview = other;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ids() -> (RequestId, RequestId) {
        let session = Uuid::now_v7();
        (RequestId::new(session, 1), RequestId::new(session, 2))
    }

    #[test]
    fn test_preview_mode_stages_poem() {
        let (id, _) = ids();
        let mut surface = TextSurface::new(ApplyMode::Preview);
        surface.document_mut().insert_text("قمر");
        surface.expect(id);
        surface.show_progress();
        assert_eq!(surface.preview().to_string(), PROGRESS_NOTICE);

        assert!(surface.apply_result(id, &GenerationResult::success("بيت")));

        assert_eq!(surface.preview(), &Preview::Poem("بيت".to_string()));
        assert_eq!(surface.document().text(), "قمر");
    }

    #[test]
    fn test_document_mode_replaces_marked_region() {
        let (first, second) = ids();
        let mut surface = TextSurface::new(ApplyMode::Document);

        surface.expect(first);
        surface.apply_result(first, &GenerationResult::success("أول"));
        surface.expect(second);
        surface.apply_result(second, &GenerationResult::success("ثان"));

        assert_eq!(surface.document().text(), "ثان");
        assert_eq!(surface.document().marked_text(), Some("ثان"));
    }

    #[test]
    fn test_rejects_unexpected_id() {
        let (first, second) = ids();
        let mut surface = TextSurface::new(ApplyMode::Preview);
        surface.expect(second);

        assert!(!surface.apply_result(first, &GenerationResult::success("قديم")));
        assert_eq!(surface.preview(), &Preview::Empty);
        assert_eq!(surface.expected(), Some(second));
    }

    #[test]
    fn test_failure_never_touches_document() {
        let (id, _) = ids();
        let mut surface = TextSurface::new(ApplyMode::Document);
        surface.document_mut().insert_text("مسودة");
        surface.expect(id);

        surface.apply_result(id, &GenerationResult::failure(ErrorKind::Network, "Timeout after 60s"));

        assert_eq!(surface.document().text(), "مسودة");
        assert_eq!(
            surface.preview(),
            &Preview::Diagnostic("Network error: Timeout after 60s".to_string())
        );
    }

    #[test]
    fn test_diagnostics_per_kind() {
        assert!(diagnostic(ErrorKind::Protocol, "bad").starts_with("Failed to generate poem"));
        assert_eq!(diagnostic(ErrorKind::Empty, "ignored"), EMPTY_PROMPT_HINT);
    }

    #[test]
    fn test_paste_moves_poem() {
        let (id, _) = ids();
        let mut surface = TextSurface::new(ApplyMode::Preview);
        surface.document_mut().insert_text("حب ");
        surface.expect(id);
        surface.apply_result(id, &GenerationResult::success("قصيدة"));

        assert!(surface.paste());

        assert_eq!(surface.document().text(), "حب قصيدة");
        assert_eq!(surface.document().marked_text(), Some("قصيدة"));
        assert_eq!(surface.preview(), &Preview::Empty);
    }

    #[test]
    fn test_paste_ignores_diagnostic() {
        let mut surface = TextSurface::new(ApplyMode::Preview);
        surface.show_diagnostic(ErrorKind::Empty, "");

        assert!(!surface.paste());
        assert!(surface.document().is_empty());
        assert!(matches!(surface.preview(), Preview::Diagnostic(_)));
    }

    #[test]
    fn test_apply_mode_serde() {
        let mode: ApplyMode = serde_yaml::from_str("document").unwrap();
        assert_eq!(mode, ApplyMode::Document);
        assert_eq!(ApplyMode::default(), ApplyMode::Preview);
    }
}
