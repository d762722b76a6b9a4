//! Key/value persistence for session identity and history.
//!
//! The session manager only ever reads and writes whole values under the
//! fixed keys below, so any string store will do.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::ChatError;

pub const SESSION_ID_KEY: &str = "chatbot_session_id";
pub const LAST_ACTIVITY_KEY: &str = "chatbot_last_activity";
pub const MESSAGES_KEY: &str = "chatbot_messages";

pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ChatError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ChatError>;
    fn remove(&self, key: &str) -> Result<(), ChatError>;
}

/// Process-scoped store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ChatError> {
        let values = self
            .values
            .lock()
            .map_err(|_| ChatError::Store("memory store lock poisoned".into()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ChatError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| ChatError::Store("memory store lock poisoned".into()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ChatError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| ChatError::Store("memory store lock poisoned".into()))?;
        values.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object file, rewritten whole on every change.
#[derive(Debug)]
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

    /// `<data_local_dir>/askbox/session.json`
    pub fn default_path() -> Result<PathBuf, ChatError> {
        let dir = dirs::data_local_dir()
            .ok_or_else(|| ChatError::Store("could not determine data directory".into()))?;
        Ok(dir.join("askbox").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, ChatError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            ChatError::Store(format!("failed to read {}: {e}", self.path.display()))
        })?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        match serde_json::from_str(&content) {
            Ok(values) => Ok(values),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Session file is unreadable, treating it as empty"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<(), ChatError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ChatError::Store(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let json = serde_json::to_string_pretty(values)
            .map_err(|e| ChatError::Store(format!("failed to encode session file: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| ChatError::Store(format!("failed to write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            ChatError::Store(format!("failed to replace {}: {e}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), keys = values.len(), "session file written");
        Ok(())
    }

    fn with_lock<T>(&self, f: impl FnOnce() -> Result<T, ChatError>) -> Result<T, ChatError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| ChatError::Store("file store lock poisoned".into()))?;
        f()
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ChatError> {
        self.with_lock(|| Ok(self.read_all()?.remove(key)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ChatError> {
        self.with_lock(|| {
            let mut values = self.read_all()?;
            values.insert(key.to_string(), value.to_string());
            self.write_all(&values)
        })
    }

    fn remove(&self, key: &str) -> Result<(), ChatError> {
        self.with_lock(|| {
            let mut values = self.read_all()?;
            if values.remove(key).is_some() {
                self.write_all(&values)?;
            }
            Ok(())
        })
    }
}
