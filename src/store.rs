//! Local key-value state.
//!
//! The engine reads and writes a handful of well-known keys; this module
//! hides where they live. `MemoryStore` backs tests and ephemeral runs,
//! `JsonFileStore` gives process-lifetime-plus-disk persistence by
//! rewriting one JSON document per mutation — each write is all-or-nothing,
//! there is no partial-write recovery to do. Storage failures are not
//! modeled: a file store that cannot write logs and carries on.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Well-known state keys, shared with any presentation surface.
pub mod keys {
    pub const CURRENT_AD: &str = "currentAd";
    pub const HISTORY: &str = "history";
    pub const HISTORY_RETENTION: &str = "historyRetention";
    pub const LAST_ERROR: &str = "lastError";
    pub const IS_LOADING: &str = "isLoading";
    pub const OPTED_OUT_TOPICS: &str = "optedOutTopics";
}

/// A flat string-keyed store of JSON-encoded values.
pub trait StateStore: Send {
    fn get_raw(&self, key: &str) -> Option<String>;
    fn set_raw(&self, key: &str, value: String);
    fn remove(&self, key: &str);
    fn clear(&self);
}

/// Read a typed value from a store key. Missing or malformed values
/// degrade to `None`.
pub fn get_json<T: DeserializeOwned>(store: &dyn StateStore, key: &str) -> Option<T> {
    let raw = store.get_raw(key)?;
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("Discarding malformed value for {}: {}", key, e);
            None
        }
    }
}

/// Write a typed value to a store key.
pub fn set_json<T: Serialize>(store: &dyn StateStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set_raw(key, raw),
        Err(e) => log::warn!("Failed to encode value for {}: {}", key, e),
    }
}

/// In-memory store: the test fake, also useful for ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        lock(&self.map).get(key).cloned()
    }

    fn set_raw(&self, key: &str, value: String) {
        lock(&self.map).insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        lock(&self.map).remove(key);
    }

    fn clear(&self) {
        lock(&self.map).clear();
    }
}

/// File-backed store: one JSON object, rewritten in full on every mutation.
pub struct JsonFileStore {
    path: PathBuf,
    map: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open (or create) a store at `path`. An unreadable or malformed file
    /// starts the store empty rather than failing.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let map = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(map) => map,
                Err(e) => {
                    log::warn!("State file {} is malformed, starting empty: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self {
            path,
            map: Mutex::new(map),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, map: &BTreeMap<String, String>) {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    log::warn!("Failed to create {}: {}", parent.display(), e);
                    return;
                }
            }
        }
        match serde_json::to_string_pretty(map) {
            Ok(doc) => {
                if let Err(e) = fs::write(&self.path, doc) {
                    log::warn!("Failed to write {}: {}", self.path.display(), e);
                }
            }
            Err(e) => log::warn!("Failed to encode state: {}", e),
        }
    }
}

impl StateStore for JsonFileStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        lock(&self.map).get(key).cloned()
    }

    fn set_raw(&self, key: &str, value: String) {
        let mut map = lock(&self.map);
        map.insert(key.to_string(), value);
        self.flush(&map);
    }

    fn remove(&self, key: &str) {
        let mut map = lock(&self.map);
        if map.remove(key).is_some() {
            self.flush(&map);
        }
    }

    fn clear(&self) {
        let mut map = lock(&self.map);
        map.clear();
        self.flush(&map);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("privad-store-{}-{}.json", tag, std::process::id()))
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        set_json(&store, keys::IS_LOADING, &true);
        assert_eq!(get_json::<bool>(&store, keys::IS_LOADING), Some(true));

        store.remove(keys::IS_LOADING);
        assert_eq!(get_json::<bool>(&store, keys::IS_LOADING), None);

        set_json(&store, "a", &1);
        set_json(&store, "b", &2);
        store.clear();
        assert_eq!(get_json::<i32>(&store, "a"), None);
        assert_eq!(get_json::<i32>(&store, "b"), None);
    }

    #[test]
    fn malformed_value_degrades_to_none() {
        let store = MemoryStore::new();
        store.set_raw(keys::CURRENT_AD, "{not json".to_string());
        assert_eq!(get_json::<serde_json::Value>(&store, keys::CURRENT_AD), None);
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let path = temp_path("reopen");
        let _ = fs::remove_file(&path);

        {
            let store = JsonFileStore::open(&path);
            set_json(&store, keys::HISTORY_RETENTION, &"week");
        }
        {
            let store = JsonFileStore::open(&path);
            assert_eq!(
                get_json::<String>(&store, keys::HISTORY_RETENTION).as_deref(),
                Some("week")
            );
        }

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn malformed_file_starts_empty() {
        let path = temp_path("corrupt");
        fs::write(&path, "!! not json !!").unwrap();

        let store = JsonFileStore::open(&path);
        assert_eq!(get_json::<String>(&store, "anything"), None);

        let _ = fs::remove_file(&path);
    }
}
