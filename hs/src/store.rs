//! Core HandoffStore implementation

use eyre::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

const LOCK_FILE: &str = ".lock";
const VERSION_FILE: &str = ".version";
const ENTRY_EXT: &str = "json";

/// A single keyed record in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Key this entry was written under
    pub key: String,
    /// Wall-clock write time (unix ms), used for last-write-wins
    pub written_at: i64,
    /// Opaque JSON payload
    pub payload: Value,
    /// Checksum of the serialized payload for completeness checks
    pub checksum: String,
}

impl Entry {
    /// Create an entry stamped with the current time
    pub fn new(key: impl Into<String>, payload: Value) -> Self {
        Self::with_timestamp(key, payload, chrono::Utc::now().timestamp_millis())
    }

    /// Create an entry with an explicit timestamp
    pub fn with_timestamp(key: impl Into<String>, payload: Value, written_at: i64) -> Self {
        let checksum = payload_checksum(&payload);
        Self {
            key: key.into(),
            written_at,
            payload,
            checksum,
        }
    }

    /// True if the payload still matches its checksum
    pub fn is_intact(&self) -> bool {
        self.checksum == payload_checksum(&self.payload)
    }
}

/// Result of a write attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The entry replaced whatever was stored under its key
    Written,
    /// A newer entry already exists; nothing was written
    Stale { current_written_at: i64 },
}

/// The shared hand-off store
#[derive(Debug, Clone)]
pub struct HandoffStore {
    /// Base path for storage
    base_path: PathBuf,
}

impl HandoffStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;
        debug!(?base_path, "Opened handoff store");
        Ok(Self { base_path })
    }

    /// Path of the store directory
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    /// Write an entry, last-write-wins by `written_at`
    ///
    /// Writers in different processes are serialised through an advisory lock.
    /// The entry is written to a temp file and renamed into place so readers
    /// never observe a half-written file from this writer.
    pub fn write(&self, entry: &Entry) -> Result<WriteOutcome> {
        validate_key(&entry.key)?;
        debug!(key = %entry.key, written_at = entry.written_at, "write: called");
        self.locked(|| self.write_locked(entry))
    }

    /// Run `f` holding the advisory writer lock
    fn locked<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.base_path.join(LOCK_FILE))
            .context("Failed to open store lock")?;
        FileExt::lock_exclusive(&lock).context("Failed to lock store")?;

        let outcome = f();

        if let Err(e) = FileExt::unlock(&lock) {
            warn!(error = %e, "locked: failed to release store lock");
        }
        outcome
    }

    fn write_locked(&self, entry: &Entry) -> Result<WriteOutcome> {
        if let Some(current) = self.read(&entry.key)?
            && current.written_at > entry.written_at
        {
            debug!(
                key = %entry.key,
                current = current.written_at,
                incoming = entry.written_at,
                "write_locked: rejecting stale write"
            );
            return Ok(WriteOutcome::Stale {
                current_written_at: current.written_at,
            });
        }

        let tmp_path = self
            .base_path
            .join(format!(".{}.{}.tmp", entry.key, Uuid::now_v7()));
        let content = serde_json::to_vec(entry)?;
        {
            let mut tmp = fs::File::create(&tmp_path).context("Failed to create temp entry")?;
            tmp.write_all(&content)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, self.entry_path(&entry.key)).context(format!("Failed to commit entry: {}", entry.key))?;

        self.bump_version();
        info!(key = %entry.key, "Entry written");
        Ok(WriteOutcome::Written)
    }

    /// Read the latest entry for a key
    ///
    /// A missing, truncated or corrupt entry reads as `None`: the writer may
    /// simply not have finished yet.
    pub fn read(&self, key: &str) -> Result<Option<Entry>> {
        validate_key(key)?;
        let path = self.entry_path(key);

        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(%key, "read: no entry");
                return Ok(None);
            }
            Err(e) => return Err(e).context(format!("Failed to read entry: {}", key)),
        };

        let entry: Entry = match serde_json::from_slice(&content) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(%key, error = %e, "read: incomplete entry, treating as absent");
                return Ok(None);
            }
        };

        if entry.key != key || !entry.is_intact() {
            warn!(%key, "read: entry failed validation, treating as absent");
            return Ok(None);
        }

        Ok(Some(entry))
    }

    /// Remove the entry for a key, returning whether one existed
    pub fn remove(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        debug!(%key, "remove: called");
        self.locked(|| match fs::remove_file(self.entry_path(key)) {
            Ok(()) => {
                self.bump_version();
                info!(%key, "Entry removed");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).context(format!("Failed to remove entry: {}", key)),
        })
    }

    /// List all keys currently present
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();

        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().map(|e| e == ENTRY_EXT).unwrap_or(false)
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && !stem.starts_with('.')
            {
                keys.push(stem.to_string());
            }
        }

        keys.sort();
        Ok(keys)
    }

    /// Current change counter; increases after every write or remove
    ///
    /// Other processes poll this to learn that something changed without
    /// re-reading every entry.
    pub fn version(&self) -> u64 {
        fs::read_to_string(self.base_path.join(VERSION_FILE))
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Caller must hold the writer lock
    fn bump_version(&self) {
        let next = self.version() + 1;
        let tmp_path = self.base_path.join(format!("{}.{}.tmp", VERSION_FILE, Uuid::now_v7()));
        let result = fs::write(&tmp_path, format!("{}", next))
            .and_then(|()| fs::rename(&tmp_path, self.base_path.join(VERSION_FILE)));
        if let Err(e) = result {
            warn!(error = %e, "Failed to bump store version");
            let _ = fs::remove_file(&tmp_path);
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.{}", key, ENTRY_EXT))
    }
}

/// Keys become file names, so only a conservative character set is allowed
fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if !valid {
        return Err(eyre::eyre!("Invalid key: {:?}", key));
    }
    Ok(())
}

/// Simple hash for change detection, not cryptographic
fn payload_checksum(payload: &Value) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    payload.to_string().hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
