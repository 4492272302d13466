//! Per-customer key/value checkpoint state that makes exports incremental.
//!
//! Keys in use:
//!
//! | Key | Value |
//! |-----|-------|
//! | `boardlist` | JSON array of board ref ids ever exported |
//! | `projectboardlist:<project>` | JSON array of board ref ids for a project |
//! | `issue_board:<issue>` | JSON array of board ref ids showing an issue |
//! | `sprint_<id>` | epoch millis when a closed sprint was exported |
//!
//! [`FileCheckpointStore`] persists a JSON document at
//! `<state_dir>/<customer_id>.json`; writes use the atomic `.tmp` + rename
//! pattern. [`MemoryCheckpointStore`] keeps everything in process.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{checkpoint_io_err, CheckpointError};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

pub const BOARD_LIST_KEY: &str = "boardlist";

pub fn project_board_list_key(project_ref_id: &str) -> String {
    format!("projectboardlist:{project_ref_id}")
}

pub fn issue_board_key(issue_ref_id: &str) -> String {
    format!("issue_board:{issue_ref_id}")
}

pub fn sprint_key(sprint_id: u64) -> String {
    format!("sprint_{sprint_id}")
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Key/value state shared by every board task of an export run.
///
/// Implementations must be safe to call from many threads at once, and
/// [`CheckpointStore::append_unique`] must be an atomic read-modify-write.
pub trait CheckpointStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, CheckpointError>;

    fn set(&self, key: &str, value: Value) -> Result<(), CheckpointError>;

    /// Like [`CheckpointStore::set`], but the entry disappears after `ttl`.
    fn set_with_ttl(&self, key: &str, value: Value, ttl: Duration)
        -> Result<(), CheckpointError>;

    fn exists(&self, key: &str) -> Result<bool, CheckpointError>;

    fn delete(&self, key: &str) -> Result<(), CheckpointError>;

    /// Append each of `values` to the string array at `key` unless already
    /// present. Returns `true` when the stored array changed.
    fn append_unique(&self, key: &str, values: &[String]) -> Result<bool, CheckpointError>;

    /// All live keys, sorted.
    fn keys(&self) -> Result<Vec<String>, CheckpointError>;
}

/// Read the string array at `key`; a missing key is an empty list.
pub fn get_string_list(
    store: &dyn CheckpointStore,
    key: &str,
) -> Result<Vec<String>, CheckpointError> {
    match store.get(key)? {
        None => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value).map_err(|source| {
            CheckpointError::UnexpectedValue {
                key: key.to_string(),
                source,
            }
        }),
    }
}

// ---------------------------------------------------------------------------
// Shared entry table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Entry {
    value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Entries(BTreeMap<String, Entry>);

impl Entries {
    fn get(&self, key: &str) -> Option<&Value> {
        let now = Utc::now();
        self.0
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| &e.value)
    }

    fn insert(&mut self, key: &str, value: Value, ttl: Option<Duration>) {
        // A TTL too large to represent never expires.
        let expires_at = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        self.0.insert(key.to_string(), Entry { value, expires_at });
    }

    fn append_unique(&mut self, key: &str, values: &[String]) -> Result<bool, CheckpointError> {
        let mut existing: Vec<String> = match self.get(key) {
            None => Vec::new(),
            Some(value) => serde_json::from_value(value.clone()).map_err(|source| {
                CheckpointError::UnexpectedValue {
                    key: key.to_string(),
                    source,
                }
            })?,
        };
        let before = existing.len();
        for v in values {
            if !existing.contains(v) {
                existing.push(v.clone());
            }
        }
        if existing.len() == before && self.0.contains_key(key) {
            return Ok(false);
        }
        self.insert(key, Value::from(existing), None);
        Ok(true)
    }

    fn keys(&self) -> Vec<String> {
        let now = Utc::now();
        self.0
            .iter()
            .filter(|(_, e)| e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn prune_expired(&mut self) {
        let now = Utc::now();
        self.0.retain(|_, e| e.is_live(now));
    }
}

fn lock(entries: &Mutex<Entries>) -> Result<MutexGuard<'_, Entries>, CheckpointError> {
    entries.lock().map_err(|_| CheckpointError::Poisoned)
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store; state is lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    entries: Mutex<Entries>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn get(&self, key: &str) -> Result<Option<Value>, CheckpointError> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), CheckpointError> {
        lock(&self.entries)?.insert(key, value, None);
        Ok(())
    }

    fn set_with_ttl(
        &self,
        key: &str,
        value: Value,
        ttl: Duration,
    ) -> Result<(), CheckpointError> {
        lock(&self.entries)?.insert(key, value, Some(ttl));
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool, CheckpointError> {
        Ok(lock(&self.entries)?.get(key).is_some())
    }

    fn delete(&self, key: &str) -> Result<(), CheckpointError> {
        lock(&self.entries)?.0.remove(key);
        Ok(())
    }

    fn append_unique(&self, key: &str, values: &[String]) -> Result<bool, CheckpointError> {
        lock(&self.entries)?.append_unique(key, values)
    }

    fn keys(&self) -> Result<Vec<String>, CheckpointError> {
        Ok(lock(&self.entries)?.keys())
    }
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// On-disk checkpoint payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CheckpointFile {
    saved_at: DateTime<Utc>,
    #[serde(default)]
    entries: Entries,
}

/// Path to the checkpoint JSON for a customer: `<state_dir>/<customer_id>.json`.
pub fn store_path_at(state_dir: &Path, customer_id: &str) -> PathBuf {
    state_dir.join(format!("{customer_id}.json"))
}

/// JSON-file store. Mutations stay in memory until [`FileCheckpointStore::flush`].
#[derive(Debug)]
pub struct FileCheckpointStore {
    path: PathBuf,
    entries: Mutex<Entries>,
    dirty: AtomicBool,
}

impl FileCheckpointStore {
    /// Open (or start empty) the checkpoint file for `customer_id`.
    pub fn open_at(state_dir: &Path, customer_id: &str) -> Result<Self, CheckpointError> {
        let path = store_path_at(state_dir, customer_id);
        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| checkpoint_io_err(&path, e))?;
            let file: CheckpointFile = serde_json::from_str(&contents).map_err(|source| {
                CheckpointError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;
            file.entries
        } else {
            Entries::default()
        };
        tracing::debug!(path = %path.display(), keys = entries.0.len(), "opened checkpoint store");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
            dirty: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop every entry (in memory; call [`FileCheckpointStore::flush`] to persist).
    pub fn clear(&self) -> Result<(), CheckpointError> {
        lock(&self.entries)?.0.clear();
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Save the store atomically if anything changed since the last flush.
    ///
    /// Writes to `<path>.tmp` then renames to `<path>`. A failed save leaves
    /// the store dirty so the next flush retries it.
    pub fn flush(&self) -> Result<(), CheckpointError> {
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        let result = self.save();
        if result.is_err() {
            self.mark_dirty();
        }
        result
    }

    fn save(&self) -> Result<(), CheckpointError> {
        let snapshot = {
            let mut guard = lock(&self.entries)?;
            guard.prune_expired();
            guard.clone()
        };
        let file = CheckpointFile {
            saved_at: Utc::now(),
            entries: snapshot,
        };

        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| checkpoint_io_err(dir, e))?;
        }
        let json = serde_json::to_string_pretty(&file)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json).map_err(|e| checkpoint_io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(checkpoint_io_err(&self.path, e));
        }
        tracing::debug!(path = %self.path.display(), "checkpoint store saved");
        Ok(())
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn get(&self, key: &str) -> Result<Option<Value>, CheckpointError> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), CheckpointError> {
        lock(&self.entries)?.insert(key, value, None);
        self.mark_dirty();
        Ok(())
    }

    fn set_with_ttl(
        &self,
        key: &str,
        value: Value,
        ttl: Duration,
    ) -> Result<(), CheckpointError> {
        lock(&self.entries)?.insert(key, value, Some(ttl));
        self.mark_dirty();
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool, CheckpointError> {
        Ok(lock(&self.entries)?.get(key).is_some())
    }

    fn delete(&self, key: &str) -> Result<(), CheckpointError> {
        if lock(&self.entries)?.0.remove(key).is_some() {
            self.mark_dirty();
        }
        Ok(())
    }

    fn append_unique(&self, key: &str, values: &[String]) -> Result<bool, CheckpointError> {
        let changed = lock(&self.entries)?.append_unique(key, values)?;
        if changed {
            self.mark_dirty();
        }
        Ok(changed)
    }

    fn keys(&self) -> Result<Vec<String>, CheckpointError> {
        Ok(lock(&self.entries)?.keys())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
