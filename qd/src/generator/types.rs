//! Generation result types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure classes surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Endpoint unreachable, timeout, connection drop, hand-off wait exceeded
    Network,
    /// Unexpected status or response shape
    Protocol,
    /// Nothing usable to send
    Empty,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Network => "network",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Empty => "empty",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of one generation request, consumed exactly once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationResult {
    Success { text: String },
    Failure { kind: ErrorKind, message: String },
}

impl GenerationResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self::Success { text: text.into() }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Error class, if this is a failure
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

/// Convert `\r\n` and lone `\r` to `\n`; nothing else is touched
pub fn normalize_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
