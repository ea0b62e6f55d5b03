use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{KeyValueStore, StorageError};

/// In-process store for tests. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries().contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Memory store whose writes to one chosen key per operation always fail.
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    failing_set: Mutex<Option<&'static str>>,
    failing_remove: Mutex<Option<&'static str>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_set(&self, key: &'static str) {
        *self.failing_set.lock().unwrap_or_else(PoisonError::into_inner) = Some(key);
    }

    pub fn fail_remove(&self, key: &'static str) {
        *self.failing_remove.lock().unwrap_or_else(PoisonError::into_inner) = Some(key);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    fn check(slot: &Mutex<Option<&'static str>>, key: &str) -> Result<(), StorageError> {
        match *slot.lock().unwrap_or_else(PoisonError::into_inner) {
            Some(failing) if failing == key => Err(StorageError::Io {
                path: PathBuf::from(format!("{key}.json")),
                source: std::io::Error::other("write refused"),
            }),
            _ => Ok(()),
        }
    }
}

impl KeyValueStore for FaultyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Self::check(&self.failing_set, key)?;
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        Self::check(&self.failing_remove, key)?;
        self.inner.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new();
        store.set("user", "{}").unwrap();
        assert_eq!(store.get("user").unwrap().as_deref(), Some("{}"));
        assert!(store.contains_key("user"));

        store.remove("user").unwrap();
        assert!(store.get("user").unwrap().is_none());
        // second remove is a no-op
        store.remove("user").unwrap();
    }

    #[test]
    fn test_faulty_store_refuses_only_chosen_key() {
        let store = FaultyStore::new();
        store.set("user", "{}").unwrap();
        store.fail_remove("linkedInProfile");

        assert!(store.remove("linkedInProfile").is_err());
        store.remove("user").unwrap();
        assert!(!store.contains_key("user"));

        store.fail_set("user");
        assert!(store.set("user", "{}").is_err());
        store.set("linkedInProfile", "{}").unwrap();
    }
}
