//! Generator error types

use std::time::Duration;
use thiserror::Error;

use super::ErrorKind;

/// Errors that can occur while obtaining a poem
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Transport failure: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("Hand-off store error: {0}")]
    Handoff(String),

    #[error("No result from executor after {0:?}")]
    HandoffTimeout(Duration),

    /// Failure reported by the executor on the other side of the hand-off
    #[error("{message}")]
    Remote { kind: ErrorKind, message: String },
}

impl GenerateError {
    /// Classify into the user-facing error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerateError::Network(_)
            | GenerateError::Timeout(_)
            | GenerateError::Handoff(_)
            | GenerateError::HandoffTimeout(_) => ErrorKind::Network,
            GenerateError::ApiError { .. } | GenerateError::InvalidResponse(_) | GenerateError::Json(_) => {
                ErrorKind::Protocol
            }
            GenerateError::EmptyPrompt => ErrorKind::Empty,
            GenerateError::Remote { kind, .. } => *kind,
        }
    }
}
