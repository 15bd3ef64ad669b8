//! Hand-off channel implementations
//!
//! The same protocol runs over a store directory shared between processes or
//! an in-memory map when both sides live in one process.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use eyre::{Result, eyre};
use handoffstore::{Entry, HandoffStore, WriteOutcome};
use tracing::{debug, warn};

use super::HandoffRecord;

/// Write-latest / read-latest key/value access for hand-off records
pub trait HandoffChannel: Send + Sync {
    /// Store a record; returns false if a newer record was already there
    fn write(&self, key: &str, record: &HandoffRecord) -> Result<bool>;

    /// Latest record for a key; `None` means nothing ready yet
    fn read(&self, key: &str) -> Result<Option<HandoffRecord>>;

    /// Changes whenever any record is written
    fn version(&self) -> u64;
}

/// Channel over an on-disk [`HandoffStore`]
#[derive(Debug, Clone)]
pub struct FileHandoff {
    store: HandoffStore,
}

impl FileHandoff {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        debug!(path = %path.as_ref().display(), "FileHandoff::open: called");
        Ok(Self {
            store: HandoffStore::open(path)?,
        })
    }

    pub fn store(&self) -> &HandoffStore {
        &self.store
    }
}

impl HandoffChannel for FileHandoff {
    fn write(&self, key: &str, record: &HandoffRecord) -> Result<bool> {
        debug!(%key, id = %record.request_id, "FileHandoff::write: called");
        let entry = Entry::with_timestamp(key, serde_json::to_value(record)?, record.written_at);
        match self.store.write(&entry)? {
            WriteOutcome::Written => Ok(true),
            WriteOutcome::Stale { current_written_at } => {
                warn!(%key, id = %record.request_id, current_written_at, "Hand-off write rejected as stale");
                Ok(false)
            }
        }
    }

    fn read(&self, key: &str) -> Result<Option<HandoffRecord>> {
        let Some(entry) = self.store.read(key)? else {
            return Ok(None);
        };
        match serde_json::from_value(entry.payload) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                // Someone else's payload under our key; nothing for us yet
                warn!(%key, error = %e, "FileHandoff::read: entry is not a hand-off record");
                Ok(None)
            }
        }
    }

    fn version(&self) -> u64 {
        self.store.version()
    }
}

/// Channel for a single process
#[derive(Debug, Default)]
pub struct MemoryHandoff {
    records: Mutex<HashMap<String, HandoffRecord>>,
    version: AtomicU64,
}

impl MemoryHandoff {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HandoffChannel for MemoryHandoff {
    fn write(&self, key: &str, record: &HandoffRecord) -> Result<bool> {
        debug!(%key, id = %record.request_id, "MemoryHandoff::write: called");
        let mut records = self.records.lock().map_err(|_| eyre!("Hand-off map lock poisoned"))?;
        if let Some(current) = records.get(key)
            && current.written_at > record.written_at
        {
            return Ok(false);
        }
        records.insert(key.to_string(), record.clone());
        self.version.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    fn read(&self, key: &str) -> Result<Option<HandoffRecord>> {
        let records = self.records.lock().map_err(|_| eyre!("Hand-off map lock poisoned"))?;
        Ok(records.get(key).cloned())
    }

    fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }
}
