//! Prompt snapshot and structured parameters

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ComposerError;

/// Number of verses requested, limited to the choices the surfaces offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct LineCount(u8);

impl LineCount {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 7;
    /// Verse count the wizard starts from
    pub const DEFAULT: LineCount = LineCount(5);

    pub fn new(count: u8) -> Result<Self, ComposerError> {
        if (Self::MIN..=Self::MAX).contains(&count) {
            Ok(Self(count))
        } else {
            Err(ComposerError::InvalidLineCount(count))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Every selectable value, in display order
    pub fn choices() -> impl Iterator<Item = LineCount> {
        (Self::MIN..=Self::MAX).map(LineCount)
    }
}

impl TryFrom<u8> for LineCount {
    type Error = ComposerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LineCount> for u8 {
    fn from(value: LineCount) -> Self {
        value.0
    }
}

impl fmt::Display for LineCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable capture of composer state at dispatch time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSnapshot {
    /// Text typed so far, as visible to the composer
    pub raw_text: String,
    pub topic: Option<String>,
    pub line_count: Option<LineCount>,
    pub style: Option<String>,
    /// Formatted instruction sent to the generator
    pub instruction: String,
}

impl PromptSnapshot {
    /// What the poem is about: typed text first, topic otherwise
    pub fn subject(&self) -> Option<&str> {
        let text = self.raw_text.trim();
        if !text.is_empty() {
            return Some(text);
        }
        self.topic.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// True when there is nothing usable to ask for
    pub fn is_blank(&self) -> bool {
        self.subject().is_none()
    }
}
