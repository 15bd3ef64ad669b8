//! Cross-process hand-off protocol
//!
//! ```text
//! input surface                     store                      executor
//! ─────────────                     ─────                      ────────
//! HandoffGenerator ──write──▶  promptText {id, prompt}  ──read──▶ Executor
//!        ▲                                                         │
//!        └──────read (same id)──  poemData {id, result}  ◀──write──┘
//! ```
//!
//! Readers treat a missing record, a torn file, or a record for another
//! request as "not ready yet".

mod channel;
mod executor;
mod generator;
mod record;

pub use channel::{FileHandoff, HandoffChannel, MemoryHandoff};
pub use executor::{Executor, ExecutorOutcome};
pub use generator::HandoffGenerator;
pub use record::{HandoffRecord, POEM_KEY, PROMPT_KEY};
