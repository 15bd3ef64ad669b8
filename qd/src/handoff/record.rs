//! Hand-off record format

use serde::{Deserialize, Serialize};

use crate::generator::GenerationResult;
use crate::tracker::{GenerationRequest, RequestId};

/// Key the input surface writes its prompt under
pub const PROMPT_KEY: &str = "promptText";

/// Key the executor writes its answer under
pub const POEM_KEY: &str = "poemData";

/// One record in the hand-off store
///
/// A prompt record has no result; an answer record echoes the prompt it
/// answers so readers can correlate by `request_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffRecord {
    pub request_id: RequestId,
    pub prompt: String,
    pub result: Option<GenerationResult>,
    /// Unix ms; last-write-wins ordering in the store
    pub written_at: i64,
}

impl HandoffRecord {
    /// Prompt waiting for an executor
    pub fn prompt(request_id: RequestId, prompt: impl Into<String>) -> Self {
        Self {
            request_id,
            prompt: prompt.into(),
            result: None,
            written_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Prompt for a dispatched request, stamped with its dispatch time
    ///
    /// Generation tasks may reach the store out of order; stamping at dispatch
    /// lets the store reject an older request's prompt as stale.
    pub fn dispatched(request: &GenerationRequest) -> Self {
        Self {
            written_at: request.submitted_at.timestamp_millis(),
            ..Self::prompt(request.id, request.prompt())
        }
    }

    /// Executor's answer to a prompt
    pub fn answer(request_id: RequestId, prompt: impl Into<String>, result: GenerationResult) -> Self {
        Self {
            result: Some(result),
            ..Self::prompt(request_id, prompt)
        }
    }

    /// True if this record carries the result for `id`
    pub fn answers(&self, id: RequestId) -> bool {
        self.request_id == id && self.result.is_some()
    }
}
