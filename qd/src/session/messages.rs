//! Session messages
//!
//! Commands, replies and events for the session actor.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::composer::{ComposerError, PromptComposer, PromptSnapshot};
use crate::generator::{ErrorKind, GenerationResult};
use crate::surface::Preview;
use crate::tracker::{RequestId, TrackerState, TrackerStats};

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Channel error")]
    ChannelError,

    #[error(transparent)]
    Composer(#[from] ComposerError),
}

/// Response from session operations
pub type SessionResponse<T> = Result<T, SessionError>;

/// What the user currently sees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceView {
    pub document: String,
    pub marked: Option<String>,
    pub preview: Preview,
    pub state: TrackerState,
    pub stats: TrackerStats,
}

/// Commands sent to the session actor
#[derive(Debug)]
pub enum SessionCommand {
    // Keystrokes
    AppendChar {
        ch: char,
        reply: oneshot::Sender<()>,
    },
    InsertSpace {
        reply: oneshot::Sender<()>,
    },
    DeleteLast {
        reply: oneshot::Sender<Option<char>>,
    },

    // Structured choices
    SetLineCount {
        count: Option<u8>,
        reply: oneshot::Sender<SessionResponse<()>>,
    },
    SetTopic {
        topic: Option<String>,
        reply: oneshot::Sender<()>,
    },
    SetStyle {
        style: Option<String>,
        reply: oneshot::Sender<()>,
    },
    /// Replace the composer wholesale (wizard settings)
    LoadComposer {
        composer: Box<PromptComposer>,
        reply: oneshot::Sender<()>,
    },

    // Generation
    Generate {
        reply: oneshot::Sender<RequestId>,
    },
    Paste {
        reply: oneshot::Sender<bool>,
    },

    // Queries
    Snapshot {
        reply: oneshot::Sender<PromptSnapshot>,
    },
    View {
        reply: oneshot::Sender<SurfaceView>,
    },

    Shutdown,
}

/// A finished generation task reporting back to the actor
#[derive(Debug)]
pub(crate) struct Completed {
    pub id: RequestId,
    pub result: GenerationResult,
}

/// Broadcast when a request changes state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Dispatched { id: RequestId },
    Applied { id: RequestId },
    Failed { id: RequestId, kind: ErrorKind, message: String },
    Superseded { id: RequestId },
    Pasted,
}

impl SessionEvent {
    /// Request this event concerns, if any
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            SessionEvent::Dispatched { id }
            | SessionEvent::Applied { id }
            | SessionEvent::Failed { id, .. }
            | SessionEvent::Superseded { id } => Some(*id),
            SessionEvent::Pasted => None,
        }
    }

    /// True for the last event a request will produce
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::Applied { .. } | SessionEvent::Failed { .. } | SessionEvent::Superseded { .. }
        )
    }
}
