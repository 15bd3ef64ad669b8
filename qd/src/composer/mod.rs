//! Prompt Composer
//!
//! Turns incrementally typed input plus a few structured choices (topic,
//! verse count, style) into an immutable [`PromptSnapshot`] whose
//! instruction text is rendered from a fixed template.

mod buffer;
mod snapshot;
pub mod template;

use thiserror::Error;

pub use buffer::PromptComposer;
pub use snapshot::{LineCount, PromptSnapshot};
pub use template::InstructionTemplate;

/// Errors from composer input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposerError {
    #[error("Line count {0} is out of range ({min}-{max})", min = LineCount::MIN, max = LineCount::MAX)]
    InvalidLineCount(u8),
}
