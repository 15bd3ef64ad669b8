//! HandoffStore - shared key/value hand-off area
//!
//! Two execution contexts that cannot call each other directly (a sandboxed
//! input surface and a network-capable host process) exchange records through
//! a directory both of them can open. Each key is a single JSON file that is
//! replaced atomically, so a reader sees either the previous entry or the new
//! one, never a mix.
//!
//! # Architecture
//!
//! ```text
//! handoff/
//! ├── .lock              # advisory writer lock
//! ├── .version           # bumped after every successful write
//! ├── promptText.json    # one entry per key
//! └── poemData.json
//! ```
//!
//! # Example
//!
//! ```ignore
//! use handoffstore::{Entry, HandoffStore};
//!
//! let store = HandoffStore::open(handoffstore::default_store_path())?;
//! store.write(&Entry::new("promptText", serde_json::json!({"prompt": "..."})))?;
//! let entry = store.read("promptText")?;
//! ```

pub mod cli;
pub mod config;
mod store;

use std::path::PathBuf;

pub use store::{Entry, HandoffStore, WriteOutcome};

/// Directory name used under the platform data dir
pub const STORE_DIR_NAME: &str = "handoff";

/// Default location of the shared store
pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("qasida")
        .join(STORE_DIR_NAME)
}
