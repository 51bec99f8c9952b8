//! Namespaced key/value storage
//!
//! Configuration objects persist their parameters through [`KeyValueStore`]. Every
//! value is typed ([`StoredValue`]); a read of an absent key is not an error and
//! yields `None`. Reading a key that holds a value of another type is treated the
//! same way as an absent key so that partial loads never fail on stale data.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// Typed value kept in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StoredValue {
    U8(u8),
    U16(u16),
    U32(u32),
    Str(String),
    Blob(Vec<u8>),
}

#[derive(Debug, Display, Error)]
pub enum StorageError {
    #[display("storage I/O failed for {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[display("storage content of {path} is malformed: {source}")]
    Serialization {
        path: String,
        source: serde_json::Error,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Persistent backend consumed by configuration objects.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `Ok(None)` when the key (or the namespace) does not exist.
    fn read(&self, namespace: &str, key: &str) -> StorageResult<Option<StoredValue>>;

    fn write(&self, namespace: &str, key: &str, value: StoredValue) -> StorageResult<()>;

    /// Remove every key of the namespace.
    fn erase(&self, namespace: &str) -> StorageResult<()>;
}

/// Typed view over one namespace of a [`KeyValueStore`]
pub struct Namespace<'a> {
    store: &'a dyn KeyValueStore,
    name: &'a str,
}

impl<'a> Namespace<'a> {
    pub fn new(store: &'a dyn KeyValueStore, name: &'a str) -> Self {
        Self { store, name }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn read_u8(&self, key: &str) -> StorageResult<Option<u8>> {
        Ok(match self.read(key)? {
            Some(StoredValue::U8(value)) => Some(value),
            _ => None,
        })
    }

    pub fn read_u16(&self, key: &str) -> StorageResult<Option<u16>> {
        Ok(match self.read(key)? {
            Some(StoredValue::U16(value)) => Some(value),
            _ => None,
        })
    }

    pub fn read_u32(&self, key: &str) -> StorageResult<Option<u32>> {
        Ok(match self.read(key)? {
            Some(StoredValue::U32(value)) => Some(value),
            _ => None,
        })
    }

    pub fn read_string(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(match self.read(key)? {
            Some(StoredValue::Str(value)) => Some(value),
            _ => None,
        })
    }

    pub fn read_blob(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(match self.read(key)? {
            Some(StoredValue::Blob(value)) => Some(value),
            _ => None,
        })
    }

    pub fn write_u8(&self, key: &str, value: u8) -> StorageResult<()> {
        self.store.write(self.name, key, StoredValue::U8(value))
    }

    pub fn write_u16(&self, key: &str, value: u16) -> StorageResult<()> {
        self.store.write(self.name, key, StoredValue::U16(value))
    }

    pub fn write_u32(&self, key: &str, value: u32) -> StorageResult<()> {
        self.store.write(self.name, key, StoredValue::U32(value))
    }

    pub fn write_string(&self, key: &str, value: &str) -> StorageResult<()> {
        self.store
            .write(self.name, key, StoredValue::Str(value.to_string()))
    }

    pub fn write_blob(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.store
            .write(self.name, key, StoredValue::Blob(value.to_vec()))
    }

    pub fn erase(&self) -> StorageResult<()> {
        self.store.erase(self.name)
    }

    fn read(&self, key: &str) -> StorageResult<Option<StoredValue>> {
        let value = self.store.read(self.name, key)?;
        if value.is_none() {
            log::trace!("Key {}/{} not present", self.name, key);
        }
        Ok(value)
    }
}
