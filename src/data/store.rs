//! Local persisted storage
//!
//! Small key -> blob store for client state that must survive restarts
//! (filters, session votes, anonymous session id). Blobs are read and
//! written wholesale; there is no partial write discipline.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::AppError;

/// Storage key of the persisted filter state
pub const FILTERS_KEY: &str = "promptscroll-filters";
/// Storage key of the session vote ledger
pub const SESSION_VOTES_KEY: &str = "promptscroll-session-votes";
/// Storage key of the anonymous session id
pub const SESSION_ID_KEY: &str = "promptscroll-session-id";

/// Key/value blob storage
pub trait LocalStore: Send + Sync {
    /// Read a blob, `None` if absent
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    /// Replace a blob
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    /// Delete a blob (absent keys are not an error)
    fn remove(&self, key: &str) -> Result<(), AppError>;
}

/// File-backed store: one `<key>.json` file per key inside a directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) the storage directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, AppError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| {
            AppError::Storage(format!("Failed to create {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Storage(format!("Failed to read {key}: {e}"))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let path = self.path_for(key);
        // Write to a sibling file first so a crash never leaves a half blob
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)
            .and_then(|_| std::fs::rename(&tmp, &path))
            .map_err(|e| AppError::Storage(format!("Failed to write {key}: {e}")))
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("Failed to remove {key}: {e}"))),
        }
    }
}

/// In-memory store, used by tests and headless sessions
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Load and decode a JSON blob.
///
/// Missing, unreadable or corrupt blobs yield `None`; the failure is
/// logged and counted, never returned.
pub fn load_json<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(error) => {
            tracing::warn!(key, %error, "Local blob unreadable, using defaults");
            record_fallback(key);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(key, %error, "Local blob corrupt, using defaults");
            record_fallback(key);
            None
        }
    }
}

/// Encode and store a JSON blob.
///
/// Persistence failures are logged; in-memory state stays authoritative.
pub fn save_json<T: Serialize>(store: &dyn LocalStore, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(AppError::from)
        .and_then(|raw| store.set(key, &raw));

    if let Err(error) = result {
        tracing::warn!(key, %error, "Failed to persist local blob");
    }
}

fn record_fallback(key: &str) {
    crate::metrics::STORAGE_FALLBACKS_TOTAL
        .with_label_values(&[key])
        .inc();
}
