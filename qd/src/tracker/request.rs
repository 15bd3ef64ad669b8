//! Request identity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::composer::PromptSnapshot;

/// Identifies one generation request
///
/// `seq` orders requests within a session; `session` keeps ids from
/// different processes (or restarts) from colliding in the hand-off store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId {
    pub session: Uuid,
    pub seq: u64,
}

impl RequestId {
    pub fn new(session: Uuid, seq: u64) -> Self {
        Self { session, seq }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.session, self.seq)
    }
}

/// A snapshot bound to an id, owned by the tracker while live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub id: RequestId,
    pub snapshot: PromptSnapshot,
    pub submitted_at: DateTime<Utc>,
}

impl GenerationRequest {
    pub fn new(id: RequestId, snapshot: PromptSnapshot) -> Self {
        Self {
            id,
            snapshot,
            submitted_at: Utc::now(),
        }
    }

    /// Instruction text to send
    pub fn prompt(&self) -> &str {
        &self.snapshot.instruction
    }
}
