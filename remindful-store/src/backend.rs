//! Key-value backends holding JSON documents.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use remindful_core::StoreError;
use serde_json::{Map, Value};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store file {} is not a JSON object", .0.display())]
    NotAnObject(PathBuf),
}

impl From<BackendError> for StoreError {
    fn from(err: BackendError) -> Self {
        StoreError::backend(err)
    }
}

fn io_err<'a>(op: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> BackendError + 'a {
    move |source| BackendError::Io {
        op,
        path: path.to_path_buf(),
        source,
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Minimal get/set contract the task store is built on.
pub trait StoreBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, BackendError>;
    fn set(&self, key: &str, value: Value) -> Result<(), BackendError>;

    /// Pick up writes made outside this instance. Returns whether anything
    /// was reloaded.
    fn refresh(&self) -> Result<bool, BackendError> {
        Ok(false)
    }
}

impl<B: StoreBackend + ?Sized> StoreBackend for Arc<B> {
    fn get(&self, key: &str) -> Result<Option<Value>, BackendError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Value) -> Result<(), BackendError> {
        (**self).set(key, value)
    }

    fn refresh(&self) -> Result<bool, BackendError> {
        (**self).refresh()
    }
}

/// Process-local backend, for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: Mutex<Map<String, Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, BackendError> {
        Ok(lock(&self.data).get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), BackendError> {
        lock(&self.data).insert(key.to_string(), value);
        Ok(())
    }
}

/// What a file looked like when it was last loaded or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: SystemTime,
    len: u64,
}

fn fingerprint(path: &Path) -> Option<Fingerprint> {
    let meta = fs::metadata(path).ok()?;
    Some(Fingerprint {
        modified: meta.modified().ok()?,
        len: meta.len(),
    })
}

#[derive(Debug, Default)]
struct FileState {
    doc: Map<String, Value>,
    seen: Option<Fingerprint>,
    /// Set by a reload nobody has reported through `refresh_if_changed` yet.
    unreported_reload: bool,
}

/// Whole-document JSON file shared between processes.
///
/// Reads and writes first reload the document if another process changed
/// the file, so a write never replaces keys it did not touch with stale
/// copies. Every `set` rewrites the file atomically (temp file + rename).
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl JsonFileStore {
    /// Open `path`, treating a missing file as an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let path = path.into();
        let state = load(&path)?;
        debug!(path = %path.display(), keys = state.doc.len(), "opened store file");
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the document was reloaded from disk since the previous call,
    /// either now or as part of an earlier read or write.
    pub fn refresh_if_changed(&self) -> Result<bool, BackendError> {
        let mut state = lock(&self.state);
        self.sync(&mut state)?;
        Ok(std::mem::take(&mut state.unreported_reload))
    }

    fn sync(&self, state: &mut FileState) -> Result<bool, BackendError> {
        if fingerprint(&self.path) == state.seen {
            return Ok(false);
        }
        *state = FileState {
            unreported_reload: true,
            ..load(&self.path)?
        };
        info!(path = %self.path.display(), "store file changed on disk; reloaded");
        Ok(true)
    }

    fn persist(&self, state: &mut FileState) -> Result<(), BackendError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err("create", parent))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(&state.doc)?;
        fs::write(&tmp, body).map_err(io_err("write", &tmp))?;
        fs::rename(&tmp, &self.path).map_err(io_err("rename", &self.path))?;

        state.seen = fingerprint(&self.path);
        Ok(())
    }
}

impl StoreBackend for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, BackendError> {
        Ok(lock(&self.state).doc.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), BackendError> {
        let mut state = lock(&self.state);
        self.sync(&mut state)?;
        let previous = state.doc.insert(key.to_string(), value);
        if let Err(e) = self.persist(&mut state) {
            // Keep memory in step with disk.
            match previous {
                Some(v) => state.doc.insert(key.to_string(), v),
                None => state.doc.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn refresh(&self) -> Result<bool, BackendError> {
        let mut state = lock(&self.state);
        self.sync(&mut state)
    }
}

fn load(path: &Path) -> Result<FileState, BackendError> {
    if !path.exists() {
        return Ok(FileState::default());
    }
    let seen = fingerprint(path);
    let raw = fs::read_to_string(path).map_err(io_err("read", path))?;
    if raw.trim().is_empty() {
        return Ok(FileState {
            seen,
            ..FileState::default()
        });
    }
    match serde_json::from_str::<Value>(&raw)? {
        Value::Object(doc) => Ok(FileState {
            doc,
            seen,
            unreported_reload: false,
        }),
        _ => Err(BackendError::NotAnObject(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn in_memory_get_set() {
        let store = InMemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", json!([1, 2])).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!([1, 2])));
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("tasks").unwrap(), None);
        store.set("tasks", json!([{"id": "a"}])).unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("tasks").unwrap(), Some(json!([{"id": "a"}])));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn refresh_picks_up_external_writes_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let daemon = JsonFileStore::open(&path).unwrap();
        daemon.set("settings", json!({"a": 1})).unwrap();
        assert!(!daemon.refresh_if_changed().unwrap());

        // Another process rewrites the file.
        let other = JsonFileStore::open(&path).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        other.set("settings", json!({"a": 2})).unwrap();

        assert!(daemon.refresh_if_changed().unwrap());
        assert_eq!(daemon.get("settings").unwrap(), Some(json!({"a": 2})));
        assert!(!daemon.refresh_if_changed().unwrap());
    }

    #[test]
    fn set_keeps_keys_written_by_another_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let daemon = JsonFileStore::open(&path).unwrap();
        daemon.set("tasks", json!([])).unwrap();

        let other = JsonFileStore::open(&path).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        other.set("history", json!(["seen"])).unwrap();

        daemon.set("tasks", json!([{"id": "a"}])).unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("history").unwrap(), Some(json!(["seen"])));
        assert_eq!(reopened.get("tasks").unwrap(), Some(json!([{"id": "a"}])));
        // The reload happened inside `set`; it is still reported once.
        assert!(daemon.refresh_if_changed().unwrap());
        assert!(!daemon.refresh_if_changed().unwrap());
    }

    #[test]
    fn non_object_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "[1,2,3]").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(BackendError::NotAnObject(_))
        ));
    }

    #[test]
    fn empty_file_is_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "").unwrap();
        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("tasks").unwrap(), None);
    }
}
