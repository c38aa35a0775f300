//! Core KeyStore implementation

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::error::KvError;

/// Result type for key-value operations
pub type KvResult<T> = Result<T, KvError>;

/// Synchronous string key-value store
///
/// Values are opaque strings; callers own their encoding (JSON, plain text).
pub trait KeyValueStore: Send {
    /// Get the value stored under `key`
    fn get(&self, key: &str) -> KvResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &str) -> KvResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> KvResult<()>;

    /// List all keys in sorted order
    fn keys(&self) -> KvResult<Vec<String>>;
}

/// Bytes charged against a quota for one entry
fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// Total bytes of a map, skipping `except` (the key about to be replaced)
fn map_size(map: &BTreeMap<String, String>, except: &str) -> usize {
    map.iter()
        .filter(|(k, _)| k.as_str() != except)
        .map(|(k, v)| entry_size(k, v))
        .sum()
}

/// Reject a write that would push the store over its quota
fn check_quota(map: &BTreeMap<String, String>, quota: Option<usize>, key: &str, value: &str) -> KvResult<()> {
    let Some(quota) = quota else {
        return Ok(());
    };
    let needed = map_size(map, key) + entry_size(key, value);
    if needed > quota {
        debug!(%key, needed, quota, "check_quota: rejected");
        return Err(KvError::QuotaExceeded {
            key: key.to_string(),
            needed,
            quota,
        });
    }
    Ok(())
}

/// In-memory store, used for tests and ephemeral sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota_bytes: Option<usize>,
    writes: usize,
}

impl MemoryStore {
    /// Create an empty store with no quota
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that rejects writes beyond `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Number of successful `set`/`remove` calls so far
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> KvResult<()> {
        check_quota(&self.entries, self.quota_bytes, key, value)?;
        self.entries.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> KvResult<()> {
        self.entries.remove(key);
        self.writes += 1;
        Ok(())
    }

    fn keys(&self) -> KvResult<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// File-backed store: one JSON object file guarded by an advisory lock
///
/// A file that fails to parse at open time is moved to `store.json.corrupt`
/// and the store starts empty.
///
/// ```text
/// {dir}/
/// ├── store.json   # {"key": "value", ...}
/// └── store.lock   # fs2 advisory lock
/// ```
pub struct FileStore {
    data_path: PathBuf,
    lock_path: PathBuf,
    quota_bytes: Option<usize>,
    cache: BTreeMap<String, String>,
}

impl FileStore {
    /// Open or create a store in the given directory
    pub fn open(dir: impl AsRef<Path>) -> KvResult<Self> {
        Self::open_with_quota(dir, None)
    }

    /// Open or create a store with an optional byte quota
    pub fn open_with_quota(dir: impl AsRef<Path>, quota_bytes: Option<usize>) -> KvResult<Self> {
        let dir = dir.as_ref();
        debug!(?dir, ?quota_bytes, "FileStore::open_with_quota: called");
        fs::create_dir_all(dir)?;

        let mut store = Self {
            data_path: dir.join("store.json"),
            lock_path: dir.join("store.lock"),
            quota_bytes,
            cache: BTreeMap::new(),
        };
        match store.reload() {
            Err(KvError::Corrupt { path, source }) => {
                let aside = path.with_extension("json.corrupt");
                warn!(error = %source, path = %path.display(), aside = %aside.display(), "Key store file is corrupt, starting empty");
                fs::rename(&path, &aside)?;
                store.cache = BTreeMap::new();
            }
            other => other?,
        }
        info!(path = %store.data_path.display(), entries = store.cache.len(), "Opened key store");
        Ok(store)
    }

    /// Path of the backing JSON file
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Re-read the backing file, picking up writes from other processes
    ///
    /// A corrupt file is reported as [`KvError::Corrupt`] and left in place.
    pub fn reload(&mut self) -> KvResult<()> {
        debug!("FileStore::reload: called");
        self.cache = self.read_disk()?;
        Ok(())
    }

    fn read_disk(&self) -> KvResult<BTreeMap<String, String>> {
        if !self.data_path.exists() {
            debug!("FileStore::read_disk: no data file yet");
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.data_path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|source| KvError::Corrupt {
            path: self.data_path.clone(),
            source,
        })
    }

    fn write_disk(&self, map: &BTreeMap<String, String>) -> KvResult<()> {
        let tmp_path = self.data_path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(map)?;
        let mut tmp = fs::File::create(&tmp_path)?;
        tmp.write_all(content.as_bytes())?;
        tmp.sync_all()?;
        fs::rename(&tmp_path, &self.data_path)?;
        Ok(())
    }

    /// Run a read-modify-write cycle under the exclusive lock
    fn mutate<F>(&mut self, op: F) -> KvResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> KvResult<()>,
    {
        let lock = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        fs2::FileExt::lock_exclusive(&lock).map_err(|e| KvError::Unavailable(format!("lock failed: {}", e)))?;

        let result = self.read_modify_write(op);

        if let Err(e) = fs2::FileExt::unlock(&lock) {
            warn!(error = %e, "FileStore::mutate: unlock failed");
        }

        self.cache = result?;
        Ok(())
    }

    fn read_modify_write<F>(&self, op: F) -> KvResult<BTreeMap<String, String>>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> KvResult<()>,
    {
        let mut map = self.read_disk()?;
        op(&mut map)?;
        self.write_disk(&map)?;
        Ok(map)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        Ok(self.cache.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> KvResult<()> {
        debug!(%key, value_len = value.len(), "FileStore::set: called");
        let quota = self.quota_bytes;
        self.mutate(|map| {
            check_quota(map, quota, key, value)?;
            map.insert(key.to_string(), value.to_string());
            Ok(())
        })
    }

    fn remove(&mut self, key: &str) -> KvResult<()> {
        debug!(%key, "FileStore::remove: called");
        self.mutate(|map| {
            map.remove(key);
            Ok(())
        })
    }

    fn keys(&self) -> KvResult<Vec<String>> {
        Ok(self.cache.keys().cloned().collect())
    }
}

/// Cloneable handle sharing one store between several owners
///
/// Every clone reads and writes the same underlying store.
pub struct SharedStore<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> Clone for SharedStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: KeyValueStore> SharedStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    fn lock(&self) -> KvResult<MutexGuard<'_, S>> {
        self.inner
            .lock()
            .map_err(|_| KvError::Unavailable("store lock poisoned".to_string()))
    }

    /// Run `f` against the underlying store
    pub fn with<T>(&self, f: impl FnOnce(&S) -> T) -> KvResult<T> {
        Ok(f(&*self.lock()?))
    }
}

impl<S: KeyValueStore> KeyValueStore for SharedStore<S> {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        self.lock()?.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> KvResult<()> {
        self.lock()?.set(key, value)
    }

    fn remove(&mut self, key: &str) -> KvResult<()> {
        self.lock()?.remove(key)
    }

    fn keys(&self) -> KvResult<Vec<String>> {
        self.lock()?.keys()
    }
}
