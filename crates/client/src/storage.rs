//! Durable key-value storage for the persisted session record.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::Context;

use crate::error::{ClientError, ClientResult};

/// Key holding the opaque session token.
pub const TOKEN_KEY: &str = "token";
/// Key holding the JSON-serialized user profile.
pub const USER_INFO_KEY: &str = "userInfo";

/// Client-local persistent key-value store (the `localStorage` of the
/// console).
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> ClientResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ClientResult<()>;
    fn remove(&self, key: &str) -> ClientResult<()>;
}

/// In-memory storage for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// JSON-file storage: a single flat object of string values.
///
/// Every write rewrites the whole file through a temp file + rename.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Storage at `{data_dir}/jadmin/session.json`.
    pub fn open_default() -> ClientResult<Self> {
        let path = default_session_path().map_err(storage_error)?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A file that exists but does not parse is reported as
    /// [`ClientError::MalformedSession`].
    fn read_all(&self) -> ClientResult<HashMap<String, String>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {:?}", self.path))
                    .map_err(storage_error);
            }
        };

        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&raw).map_err(|e| {
            ClientError::MalformedSession(format!(
                "session file {:?} is not a JSON object of strings: {e}",
                self.path
            ))
        })
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create session directory at {:?}", parent))?;
        }

        let encoded = serde_json::to_string_pretty(entries).context("failed to encode session file")?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, encoded).with_context(|| format!("failed to write {:?}", tmp))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to move {:?} into place", tmp))?;
        Ok(())
    }

    fn update<F>(&self, apply: F) -> ClientResult<()>
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(ClientError::MalformedSession(reason)) => {
                tracing::warn!(path = ?self.path, %reason, "replacing unreadable session file");
                HashMap::new()
            }
            Err(err) => return Err(err),
        };
        apply(&mut entries);
        self.write_all(&entries).map_err(storage_error)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

fn storage_error(err: anyhow::Error) -> ClientError {
    ClientError::storage(format!("{err:#}"))
}

/// Resolve `{app_data_dir}/jadmin/session.json`.
fn default_session_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;

    let mut path = base;
    path.push("jadmin");
    path.push("session.json");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_session_file() -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("jadmin-storage-{}", uuid::Uuid::now_v7()));
        path.push("session.json");
        path
    }

    #[test]
    fn memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);

        storage.set(TOKEN_KEY, "abc").unwrap();
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));

        storage.remove(TOKEN_KEY).unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn file_storage_persists_across_instances() {
        let path = temp_session_file();

        let storage = FileStorage::new(&path);
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        storage.set(TOKEN_KEY, "abc").unwrap();
        storage.set(USER_INFO_KEY, r#"{"id":1}"#).unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));
        reopened.remove(TOKEN_KEY).unwrap();

        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(storage.get(USER_INFO_KEY).unwrap().as_deref(), Some(r#"{"id":1}"#));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn corrupt_file_is_malformed_and_gets_replaced_on_write() {
        let path = temp_session_file();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"token": "abc", "userInfo": "#).unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(storage.get(TOKEN_KEY), Err(ClientError::MalformedSession(_))));

        storage.remove(TOKEN_KEY).unwrap();
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        storage.set(TOKEN_KEY, "fresh").unwrap();
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("fresh"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
