//! Persisted key/value stores behind the profile cache
//!
//! The contract is deliberately small: string keys, string values, writes
//! that may be rejected for capacity, no transactions.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from persisted store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt store file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Namespaced string map consumed by the profile cache
pub trait PersistedStore {
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value; may be rejected when the store is full
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&mut self, key: &str);

    /// Every key currently held
    fn keys(&self) -> Vec<String>;
}

/// Bytes a map occupies, counting keys and values
fn usage(entries: &BTreeMap<String, String>) -> usize {
    entries.iter().map(|(k, v)| k.len() + v.len()).sum()
}

/// Bytes the map would occupy after writing `key = value`
fn usage_after(entries: &BTreeMap<String, String>, key: &str, value: &str) -> usize {
    let replaced = entries.get(key).map_or(0, |old| key.len() + old.len());
    usage(entries) - replaced + key.len() + value.len()
}

fn check_quota(
    entries: &BTreeMap<String, String>,
    quota: Option<usize>,
    key: &str,
    value: &str,
) -> Result<(), StoreError> {
    if let Some(quota) = quota {
        let needed = usage_after(entries, key, value);
        if needed > quota {
            return Err(StoreError::QuotaExceeded { needed, quota });
        }
    }
    Ok(())
}

/// In-memory store with an optional byte quota
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes that would take the store past `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            quota: Some(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes currently used
    pub fn usage(&self) -> usize {
        usage(&self.entries)
    }
}

impl PersistedStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        check_quota(&self.entries, self.quota, key, value)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Store kept as one JSON object on disk, rewritten on every change
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl JsonFileStore {
    /// Open `path`, starting empty if the file does not exist yet
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!("Opened store {} with {} keys", path.display(), entries.len());

        Ok(Self {
            path,
            entries,
            quota: None,
        })
    }

    pub fn with_quota(mut self, bytes: Option<usize>) -> Self {
        self.quota = bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl PersistedStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        check_quota(&self.entries, self.quota, key, value)?;
        let previous = self.entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush() {
            // Keep memory and disk in step when the write fails
            match previous {
                Some(old) => self.entries.insert(key.to_string(), old),
                None => self.entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            if let Err(e) = self.flush() {
                debug!("Failed to persist removal of {}: {}", key, e);
            }
        }
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
