//! Durable key-value persistence for client-local state.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};
use tracing::{debug, warn};

/// Synchronous string key-value store scoped to one client instance.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    /// Drops every key, including ones that can no longer be read.
    fn clear(&self) -> Result<()>;
}

/// Store backed by a single JSON object on disk.
///
/// The file is created on first write; a missing file reads as empty.
/// Writes go through a hidden sibling temp file that is synced and then
/// renamed, so a crash never leaves a half-written document behind. An
/// unparseable document fails reads but is overwritten by the next write.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_raw(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(None),
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err)
                .with_context(|| format!("failed to read store file '{}'", self.path.display())),
        }
    }

    fn read_document(&self) -> Result<Map<String, Value>> {
        let Some(raw) = self.read_raw()? else {
            return Ok(Map::new());
        };
        serde_json::from_str(&raw)
            .with_context(|| format!("store file '{}' is not a JSON object", self.path.display()))
    }

    /// Like `read_document`, but an unparseable file comes back as an empty
    /// document flagged for rewrite instead of blocking the write.
    fn read_document_for_write(&self) -> Result<(Map<String, Value>, bool)> {
        let Some(raw) = self.read_raw()? else {
            return Ok((Map::new(), false));
        };
        match serde_json::from_str(&raw) {
            Ok(document) => Ok((document, false)),
            Err(err) => {
                warn!(path = %self.path.display(), "discarding unreadable store file: {err}");
                Ok((Map::new(), true))
            }
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }

    fn write_document(&self, document: &Map<String, Value>) -> Result<()> {
        ensure_parent_dir_exists(&self.path)?;

        let encoded = serde_json::to_string_pretty(document)?;
        let tmp_path = self.tmp_path();
        let mut file = fs::File::create(&tmp_path)
            .with_context(|| format!("failed to create '{}'", tmp_path.display()))?;
        file.write_all(encoded.as_bytes())
            .with_context(|| format!("failed to write '{}'", tmp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("failed to sync '{}'", tmp_path.display()))?;
        drop(file);

        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "failed to move '{}' into place at '{}'",
                tmp_path.display(),
                self.path.display()
            )
        })?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.guard();
        let document = self.read_document()?;
        Ok(document.get(key).and_then(|value| match value {
            Value::String(text) => Some(text.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.guard();
        let (mut document, _) = self.read_document_for_write()?;
        document.insert(key.to_string(), Value::String(value.to_string()));
        self.write_document(&document)?;
        debug!(key, path = %self.path.display(), "stored key");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.guard();
        let (mut document, discarded) = self.read_document_for_write()?;
        if document.remove(key).is_none() && !discarded {
            return Ok(());
        }
        self.write_document(&document)?;
        debug!(key, path = %self.path.display(), "removed key");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.guard();
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "cleared store file");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("failed to remove store file '{}'", self.path.display())),
        }
    }
}

/// In-process store, mostly for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries().clear();
        Ok(())
    }
}

fn ensure_parent_dir_exists(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for store file '{}'",
            parent.display(),
            path.display()
        )
    })?;

    Ok(())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
