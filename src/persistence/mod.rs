//! Persistence boundary
//!
//! Everything the engine saves goes through a small key/value [`Storage`]
//! trait: LocalStorage in the browser, [`MemoryStorage`] natively and in
//! tests. Loads never fail (missing or malformed JSON becomes the type's
//! default) and saves are best-effort (failures are logged and reported as
//! `false`, never propagated).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::progress::ProgressRecord;

/// Errors from a storage backend
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No backing store (private browsing, no window)
    #[error("storage unavailable")]
    Unavailable,
    /// Store refused the write
    #[error("storage quota exceeded writing '{key}'")]
    Quota { key: String },
    #[error("failed to serialize '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Synchronous string key/value store
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-process store. Clones share the same map, so a test can keep a handle
/// and inspect what the engine wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
    /// Refuse writes (simulates a full quota)
    read_only: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes all fail with [`StorageError::Quota`]
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.raw(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.read_only {
            return Err(StorageError::Quota {
                key: key.to_string(),
            });
        }
        self.insert_raw(key, value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Browser LocalStorage
#[cfg(target_arch = "wasm32")]
pub struct LocalStorage {
    inner: Option<web_sys::Storage>,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    pub fn new() -> Self {
        let inner = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();
        if inner.is_none() {
            log::warn!("LocalStorage unavailable, progress will not be saved");
        }
        Self { inner }
    }

    fn store(&self) -> Result<&web_sys::Storage, StorageError> {
        self.inner.as_ref().ok_or(StorageError::Unavailable)
    }
}

#[cfg(target_arch = "wasm32")]
impl Default for LocalStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_arch = "wasm32")]
impl Storage for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.store()?
            .get_item(key)
            .map_err(|e| StorageError::Backend(format!("{e:?}")))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        // setItem only throws on QuotaExceededError in practice
        self.store()?
            .set_item(key, value)
            .map_err(|_| StorageError::Quota {
                key: key.to_string(),
            })
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.store()?
            .remove_item(key)
            .map_err(|e| StorageError::Backend(format!("{e:?}")))
    }
}

/// The platform's default store
#[cfg(target_arch = "wasm32")]
pub fn default_storage() -> Box<dyn Storage> {
    Box::new(LocalStorage::new())
}

#[cfg(not(target_arch = "wasm32"))]
pub fn default_storage() -> Box<dyn Storage> {
    Box::new(MemoryStorage::new())
}

/// Read and decode `key`, falling back to `T::default()`
pub fn load_or_default<T>(storage: &dyn Storage, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match storage.get(key) {
        Ok(Some(json)) => match serde_json::from_str(&json) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Malformed record at '{}' ({}), using defaults", key, e);
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            log::warn!("Could not read '{}': {}", key, e);
            T::default()
        }
    }
}

fn try_save<T: Serialize>(storage: &mut dyn Storage, key: &str, value: &T) -> Result<(), StorageError> {
    let json = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })?;
    storage.set(key, &json)
}

/// Encode and write `value`. Returns false (and logs) on failure.
pub fn save_best_effort<T: Serialize>(storage: &mut dyn Storage, key: &str, value: &T) -> bool {
    match try_save(storage, key, value) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Save failed, continuing without persistence: {}", e);
            false
        }
    }
}

/// Namespaced progress and settings records for one game
pub struct ProgressStore {
    storage: Box<dyn Storage>,
    namespace: String,
}

impl ProgressStore {
    pub fn new(storage: Box<dyn Storage>, namespace: &str) -> Self {
        Self {
            storage,
            namespace: namespace.to_string(),
        }
    }

    pub fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.namespace, suffix)
    }

    pub fn load(&self) -> ProgressRecord {
        let record: ProgressRecord = load_or_default(self.storage.as_ref(), &self.key("progress"));
        log::info!(
            "Loaded {} progress: best {}, {} achievements, streak {}",
            self.namespace,
            record.best_score,
            record.achievements.len(),
            record.streak_days
        );
        record
    }

    pub fn save(&mut self, record: &ProgressRecord) -> bool {
        let key = self.key("progress");
        save_best_effort(self.storage.as_mut(), &key, record)
    }

    /// Load any other record kept under this namespace
    pub fn load_record<T: DeserializeOwned + Default>(&self, suffix: &str) -> T {
        load_or_default(self.storage.as_ref(), &self.key(suffix))
    }

    pub fn save_record<T: Serialize>(&mut self, suffix: &str, value: &T) -> bool {
        let key = self.key(suffix);
        save_best_effort(self.storage.as_mut(), &key, value)
    }
}
