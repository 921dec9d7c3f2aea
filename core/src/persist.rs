use crate::{CategorySet, RecentSearchLog};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub const CATEGORIES_KEY: &str = "categories";
pub const RECENT_SEARCHES_KEY: &str = "recentSearches";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend: {0}")]
    Backend(#[from] sled::Error),
    #[error("stored value is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String key-value storage that survives restarts. Reads and writes are synchronous.
pub trait StateStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-process store. Clones share the same map, so a test can keep a handle and inspect
/// what was written.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn raw(&self, key: &str) -> Option<String> { self.values.lock().get(key).cloned() }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> { Ok(self.raw(key)) }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Durable store backed by a sled database directory.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let db = sled::open(dir).with_context(|| format!("opening state store at {}", dir.display()))?;
        Ok(Self { db })
    }
}

impl StateStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.db.get(key)? {
            Some(bytes) => Ok(Some(String::from_utf8(bytes.to_vec())?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.db.insert(key, value.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedState {
    pub categories: CategorySet,
    pub recent: RecentSearchLog,
}

/// Load-on-start and save-on-mutation contract over a [`StateStore`]. Every save replaces
/// the whole value under its key.
pub struct PersistenceBridge<S> {
    store: S,
}

impl<S: StateStore> PersistenceBridge<S> {
    pub fn new(store: S) -> Self { Self { store } }

    pub fn store(&self) -> &S { &self.store }

    /// Reads both keys. Absent, unreadable or corrupt values fall back to defaults.
    pub fn load_state(&self) -> LoadedState {
        let categories = self.load_or_default(CATEGORIES_KEY, CategorySet::seeded);
        let recent = self.load_or_default(RECENT_SEARCHES_KEY, RecentSearchLog::new).normalize();
        LoadedState { categories, recent }
    }

    pub fn save_category_set(&self, set: &CategorySet) -> Result<(), StoreError> {
        self.store.set(CATEGORIES_KEY, &serde_json::to_string(set)?)
    }

    pub fn save_recent_search_log(&self, log: &RecentSearchLog) -> Result<(), StoreError> {
        self.store.set(RECENT_SEARCHES_KEY, &serde_json::to_string(log)?)
    }

    fn load_or_default<T: DeserializeOwned>(&self, key: &str, default: fn() -> T) -> T {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default(),
            Err(err) => {
                tracing::warn!(key, error = %err, "reading persisted state failed, using defaults");
                return default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "persisted state is corrupt, using defaults");
                default()
            }
        }
    }
}
