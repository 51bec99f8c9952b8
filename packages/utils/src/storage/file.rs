use parking_lot::Mutex;
use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use super::{memory::MemoryStore, KeyValueStore, StorageError, StorageResult, StoredValue};

/// JSON-file-backed store
///
/// The whole file is loaded on open and rewritten after every mutation that
/// changes something, which is adequate for the handful of namespaces a device
/// keeps. Rewrites go through a sibling temporary file and a rename, so the file
/// on disk is always either the old or the new content.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    cache: MemoryStore,
    flush_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store, starting empty when the file does not exist yet
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let cache = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| StorageError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let namespaces = if content.trim().is_empty() {
                Default::default()
            } else {
                serde_json::from_str(&content).map_err(|source| StorageError::Serialization {
                    path: path.display().to_string(),
                    source,
                })?
            };
            MemoryStore::from_namespaces(namespaces)
        } else {
            log::info!("Store file {} not found, starting empty", path.display());
            MemoryStore::new()
        };

        Ok(Self {
            path,
            cache,
            flush_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn flush(&self) -> StorageResult<()> {
        let _guard = self.flush_lock.lock();
        let content = serde_json::to_string_pretty(&self.cache.snapshot()).map_err(|source| {
            StorageError::Serialization {
                path: self.path.display().to_string(),
                source,
            }
        })?;

        let temp = self.temp_path();
        fs::write(&temp, content)
            .and_then(|()| fs::rename(&temp, &self.path))
            .map_err(|source| StorageError::Io {
                path: self.path.display().to_string(),
                source,
            })
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, namespace: &str, key: &str) -> StorageResult<Option<StoredValue>> {
        self.cache.read(namespace, key)
    }

    fn write(&self, namespace: &str, key: &str, value: StoredValue) -> StorageResult<()> {
        if self.cache.read(namespace, key)?.as_ref() == Some(&value) {
            return Ok(());
        }
        self.cache.write(namespace, key, value)?;
        self.flush()
    }

    fn erase(&self, namespace: &str) -> StorageResult<()> {
        if !self.cache.contains_namespace(namespace) {
            return Ok(());
        }
        self.cache.erase(namespace)?;
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.write("wifi", "wifiSsid", StoredValue::Str("lab".into())).unwrap();
            store
                .write("wifi", "ip6GlobAddr", StoredValue::Blob(vec![0xfe, 0x80]))
                .unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(
            store.read("wifi", "wifiSsid").unwrap(),
            Some(StoredValue::Str("lab".into()))
        );
        assert_eq!(
            store.read("wifi", "ip6GlobAddr").unwrap(),
            Some(StoredValue::Blob(vec![0xfe, 0x80]))
        );
    }

    #[test]
    fn test_erase_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.write("uart", "enabled", StoredValue::U8(1)).unwrap();
        store.erase("uart").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.read("uart", "enabled").unwrap(), None);
    }

    #[test]
    fn test_rewrite_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.write("uart", "baudRate", StoredValue::U32(9600)).unwrap();
        store.write("uart", "baudRate", StoredValue::U32(19200)).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![OsString::from("store.json")]);
        assert_eq!(
            FileStore::open(&path).unwrap().read("uart", "baudRate").unwrap(),
            Some(StoredValue::U32(19200))
        );
    }

    #[test]
    fn test_unchanged_values_do_not_touch_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.write("uart", "enabled", StoredValue::U8(1)).unwrap();
        fs::write(&path, "{}").unwrap();

        store.write("uart", "enabled", StoredValue::U8(1)).unwrap();
        store.erase("wifi").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");

        store.write("uart", "enabled", StoredValue::U8(0)).unwrap();
        assert_ne!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            FileStore::open(&path),
            Err(StorageError::Serialization { .. })
        ));
    }
}
