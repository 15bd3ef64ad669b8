//! RequestTracker - last-dispatched-wins state machine
//!
//! ```text
//! Idle ──begin──▶ Dispatching ──mark_awaiting──▶ AwaitingResponse
//!   ▲                  │ begin                        │ complete(current)
//!   │                  ▼                              ▼
//!   │             Dispatching (new id)        Applying │ Failed
//!   └───────────────────── settle ◀───────────────────┘
//! ```
//!
//! A completion for any id other than the current one is superseded and
//! leaves the state untouched.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::{GenerationRequest, RequestId};
use crate::composer::PromptSnapshot;
use crate::generator::{ErrorKind, GenerationResult};

/// Tracker state; at most one live request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "id", rename_all = "snake_case")]
pub enum TrackerState {
    Idle,
    Dispatching(RequestId),
    AwaitingResponse(RequestId),
    Applying(RequestId),
    Failed(RequestId),
}

impl TrackerState {
    /// Id of the live request, if any
    pub fn current(&self) -> Option<RequestId> {
        match self {
            TrackerState::Idle => None,
            TrackerState::Dispatching(id)
            | TrackerState::AwaitingResponse(id)
            | TrackerState::Applying(id)
            | TrackerState::Failed(id) => Some(*id),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, TrackerState::Idle)
    }
}

/// What to do with a finished request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Current request succeeded; hand the text to the surface
    Apply { id: RequestId, text: String },
    /// Current request failed; show the diagnostic
    Fail {
        id: RequestId,
        kind: ErrorKind,
        message: String,
    },
    /// A newer request exists; drop the result
    Superseded { id: RequestId },
}

/// Counters for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackerStats {
    pub dispatched: u64,
    pub applied: u64,
    pub failed: u64,
    pub superseded: u64,
}

/// Guards dispatch and classifies completions for one surface
#[derive(Debug)]
pub struct RequestTracker {
    session: Uuid,
    next_seq: u64,
    state: TrackerState,
    live: Option<GenerationRequest>,
    stats: TrackerStats,
    /// Unix ms of the last dispatch; later requests must stamp strictly after it
    last_submitted_ms: Option<i64>,
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::with_session(Uuid::now_v7())
    }

    pub fn with_session(session: Uuid) -> Self {
        debug!(%session, "RequestTracker::with_session: called");
        Self {
            session,
            next_seq: 1,
            state: TrackerState::Idle,
            live: None,
            stats: TrackerStats::default(),
            last_submitted_ms: None,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn stats(&self) -> TrackerStats {
        self.stats
    }

    /// The live request, if one is outstanding
    pub fn live(&self) -> Option<&GenerationRequest> {
        self.live.as_ref()
    }

    /// Start a new request from a snapshot
    ///
    /// Accepted in any state. A request that is still outstanding is not
    /// cancelled; its result will be classified as superseded.
    ///
    /// `submitted_at` is strictly increasing at millisecond resolution within
    /// a session, so the hand-off store orders prompts by dispatch.
    pub fn begin(&mut self, snapshot: PromptSnapshot) -> GenerationRequest {
        let id = RequestId::new(self.session, self.next_seq);
        self.next_seq += 1;

        if let Some(previous) = self.state.current() {
            info!(%previous, %id, "Request superseded by newer generate");
        }

        let mut request = GenerationRequest::new(id, snapshot);
        if let Some(last) = self.last_submitted_ms
            && request.submitted_at.timestamp_millis() <= last
            && let Some(bumped) = DateTime::<Utc>::from_timestamp_millis(last + 1)
        {
            request.submitted_at = bumped;
        }
        self.last_submitted_ms = Some(request.submitted_at.timestamp_millis());

        self.live = Some(request.clone());
        self.state = TrackerState::Dispatching(id);
        self.stats.dispatched += 1;
        debug!(%id, "begin: dispatching");
        request
    }

    /// Record that the call for `id` has been issued
    pub fn mark_awaiting(&mut self, id: RequestId) -> bool {
        if self.state == TrackerState::Dispatching(id) {
            self.state = TrackerState::AwaitingResponse(id);
            debug!(%id, "mark_awaiting: awaiting response");
            true
        } else {
            debug!(%id, state = ?self.state, "mark_awaiting: not the dispatching request");
            false
        }
    }

    /// Classify a finished request
    ///
    /// For the current request the state moves to `Applying` or `Failed`;
    /// call [`settle`](Self::settle) once the surface has been updated.
    pub fn complete(&mut self, id: RequestId, result: GenerationResult) -> Completion {
        let is_current = matches!(
            self.state,
            TrackerState::Dispatching(current) | TrackerState::AwaitingResponse(current) if current == id
        );

        if !is_current {
            self.stats.superseded += 1;
            info!(%id, state = ?self.state, "Discarding superseded result");
            return Completion::Superseded { id };
        }

        match result {
            GenerationResult::Success { text } => {
                self.state = TrackerState::Applying(id);
                self.stats.applied += 1;
                Completion::Apply { id, text }
            }
            GenerationResult::Failure { kind, message } => {
                self.state = TrackerState::Failed(id);
                self.stats.failed += 1;
                Completion::Fail { id, kind, message }
            }
        }
    }

    /// Return to `Idle` after applying or failing `id`
    pub fn settle(&mut self, id: RequestId) {
        if matches!(self.state, TrackerState::Applying(current) | TrackerState::Failed(current) if current == id) {
            self.state = TrackerState::Idle;
            self.live = None;
            debug!(%id, "settle: idle");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::PromptComposer;

    fn snapshot(text: &str) -> PromptSnapshot {
        let mut composer = PromptComposer::new();
        text.chars().for_each(|c| composer.append_char(c));
        composer.snapshot()
    }

    #[test]
    fn test_success_path() {
        let mut tracker = RequestTracker::new();
        assert!(tracker.state().is_idle());

        let request = tracker.begin(snapshot("بحر"));
        assert_eq!(request.id.seq, 1);
        assert_eq!(tracker.state(), TrackerState::Dispatching(request.id));

        assert!(tracker.mark_awaiting(request.id));
        assert_eq!(tracker.state(), TrackerState::AwaitingResponse(request.id));

        let completion = tracker.complete(request.id, GenerationResult::success("موج"));
        assert_eq!(
            completion,
            Completion::Apply {
                id: request.id,
                text: "موج".to_string()
            }
        );
        assert_eq!(tracker.state(), TrackerState::Applying(request.id));

        tracker.settle(request.id);
        assert!(tracker.state().is_idle());
        assert!(tracker.live().is_none());
    }

    #[test]
    fn test_failure_path_returns_to_idle() {
        let mut tracker = RequestTracker::new();
        let request = tracker.begin(snapshot("بحر"));
        tracker.mark_awaiting(request.id);

        let completion = tracker.complete(request.id, GenerationResult::failure(ErrorKind::Network, "down"));
        assert!(matches!(completion, Completion::Fail { kind: ErrorKind::Network, .. }));
        assert_eq!(tracker.state(), TrackerState::Failed(request.id));

        tracker.settle(request.id);
        assert!(tracker.state().is_idle());
        assert_eq!(tracker.stats().failed, 1);
    }

    #[test]
    fn test_late_older_response_is_superseded() {
        let mut tracker = RequestTracker::new();
        let first = tracker.begin(snapshot("أ"));
        tracker.mark_awaiting(first.id);
        let second = tracker.begin(snapshot("ب"));
        tracker.mark_awaiting(second.id);
        assert_eq!(second.id.seq, 2);

        // Newer one answers first
        let completion = tracker.complete(second.id, GenerationResult::success("two"));
        assert!(matches!(completion, Completion::Apply { .. }));
        tracker.settle(second.id);

        // Older one arrives afterwards
        let completion = tracker.complete(first.id, GenerationResult::success("one"));
        assert_eq!(completion, Completion::Superseded { id: first.id });
        assert!(tracker.state().is_idle());

        let stats = tracker.stats();
        assert_eq!((stats.dispatched, stats.applied, stats.superseded), (2, 1, 1));
    }

    #[test]
    fn test_superseded_response_while_newer_outstanding() {
        let mut tracker = RequestTracker::new();
        let first = tracker.begin(snapshot("أ"));
        tracker.mark_awaiting(first.id);
        let second = tracker.begin(snapshot("ب"));
        tracker.mark_awaiting(second.id);

        let completion = tracker.complete(first.id, GenerationResult::failure(ErrorKind::Network, "late"));
        assert_eq!(completion, Completion::Superseded { id: first.id });
        assert_eq!(tracker.state(), TrackerState::AwaitingResponse(second.id));
    }

    #[test]
    fn test_mark_awaiting_ignores_stale_id() {
        let mut tracker = RequestTracker::new();
        let first = tracker.begin(snapshot("أ"));
        let second = tracker.begin(snapshot("ب"));

        assert!(!tracker.mark_awaiting(first.id));
        assert!(tracker.mark_awaiting(second.id));
    }

    #[test]
    fn test_settle_before_completion_is_noop() {
        let mut tracker = RequestTracker::new();
        let first = tracker.begin(snapshot("أ"));
        tracker.mark_awaiting(first.id);
        tracker.settle(first.id);
        assert_eq!(tracker.state(), TrackerState::AwaitingResponse(first.id));
    }

    #[test]
    fn test_settle_ignores_other_ids() {
        let mut tracker = RequestTracker::new();
        let first = tracker.begin(snapshot("أ"));
        tracker.mark_awaiting(first.id);
        tracker.complete(first.id, GenerationResult::success("بيت"));

        tracker.settle(RequestId::new(first.id.session, 7));
        assert_eq!(tracker.state(), TrackerState::Applying(first.id));
        tracker.settle(RequestId::new(Uuid::now_v7(), first.id.seq));
        assert_eq!(tracker.state(), TrackerState::Applying(first.id));

        tracker.settle(first.id);
        assert!(tracker.state().is_idle());
    }

    #[test]
    fn test_submitted_at_strictly_increases() {
        let mut tracker = RequestTracker::new();
        let stamps: Vec<i64> = (0..50)
            .map(|_| tracker.begin(snapshot("أ")).submitted_at.timestamp_millis())
            .collect();

        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_ids_share_session() {
        let session = Uuid::now_v7();
        let mut tracker = RequestTracker::with_session(session);
        let a = tracker.begin(snapshot("أ"));
        let b = tracker.begin(snapshot("ب"));
        assert_eq!(a.id.session, session);
        assert_eq!(b.id, RequestId::new(session, 2));
    }
}
