use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::{KeyValueStore, StorageResult, StoredValue};

pub(crate) type Namespaces = BTreeMap<String, BTreeMap<String, StoredValue>>;

/// Volatile store, used by tests and as the backing map of [`super::FileStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: RwLock<Namespaces>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_namespaces(namespaces: Namespaces) -> Self {
        Self {
            namespaces: RwLock::new(namespaces),
        }
    }

    pub(crate) fn snapshot(&self) -> Namespaces {
        self.namespaces.read().clone()
    }

    /// Check whether a namespace currently holds any key
    pub fn contains_namespace(&self, namespace: &str) -> bool {
        self.namespaces
            .read()
            .get(namespace)
            .is_some_and(|keys| !keys.is_empty())
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, namespace: &str, key: &str) -> StorageResult<Option<StoredValue>> {
        Ok(self
            .namespaces
            .read()
            .get(namespace)
            .and_then(|keys| keys.get(key))
            .cloned())
    }

    fn write(&self, namespace: &str, key: &str, value: StoredValue) -> StorageResult<()> {
        self.namespaces
            .write()
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn erase(&self, namespace: &str) -> StorageResult<()> {
        self.namespaces.write().remove(namespace);
        Ok(())
    }
}
