//! Qasida - asynchronous poem-generation hand-off pipeline
//!
//! An input surface (a custom keyboard or a step-by-step wizard) composes a
//! prompt from constrained, incrementally typed input and asks a remote
//! generator for a poem. The surface may live in a sandboxed process that
//! cannot reach the network, in which case the prompt travels through a
//! shared hand-off store to an executor process and the answer comes back
//! the same way.
//!
//! # Core Concepts
//!
//! - **Snapshots**: A generate captures an immutable prompt; later typing
//!   never changes a request in flight
//! - **Last dispatched wins**: A newer generate supersedes the old one; a late
//!   answer for an older request is dropped
//! - **Never block input**: Generation runs on spawned tasks; the session
//!   actor keeps handling keystrokes
//! - **Failures stay in the preview**: The user's document is only touched by
//!   a successful result
//!
//! # Modules
//!
//! - [`composer`] - Keystroke buffer and instruction template
//! - [`generator`] - Generator trait, HTTP client and error classification
//! - [`tracker`] - Request ids and the last-wins state machine
//! - [`surface`] - Document, preview pane and result application
//! - [`session`] - Actor tying the above together for one surface
//! - [`handoff`] - Cross-process protocol over the hand-off store
//! - [`wizard`] - Wizard step machine
//! - [`frontend`] - Terminal keyboard and wizard
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod composer;
pub mod config;
pub mod frontend;
pub mod generator;
pub mod handoff;
pub mod session;
pub mod surface;
pub mod tracker;
pub mod wizard;

// Re-export commonly used types
pub use composer::{ComposerError, InstructionTemplate, LineCount, PromptComposer, PromptSnapshot};
pub use config::Config;
pub use generator::{ErrorKind, GenerateError, GenerationResult, Generator, HttpGenerator, generate};
pub use handoff::{Executor, ExecutorOutcome, FileHandoff, HandoffChannel, HandoffGenerator, HandoffRecord, MemoryHandoff};
pub use session::{Session, SessionError, SessionEvent, SessionOptions, SurfaceView, wait_settled};
pub use surface::{ApplyMode, Document, Preview, TextSurface};
pub use tracker::{Completion, GenerationRequest, RequestId, RequestTracker, TrackerState};
pub use wizard::{Wizard, WizardError, WizardStep};
