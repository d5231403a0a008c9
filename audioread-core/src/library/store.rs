//! Key-value persistence: loading, saving, and removing JSON values.

use crate::error::{ReadError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// A durable map from string keys to JSON values.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn set(&mut self, key: &str, value: Value) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Get the base data directory for audioread.
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .map(|d| d.join("audioread"))
        .ok_or_else(|| ReadError::Persistence("Could not determine data directory".to_string()))
}

/// Stores each key as a pretty-printed JSON file in one directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            ReadError::Persistence(format!("Failed to create {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    /// Open the store in the default data directory.
    pub fn open_default() -> Result<Self> {
        Self::open(default_data_dir()?.join("store"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path)
            .map_err(|e| ReadError::Persistence(format!("Failed to open {}: {}", path.display(), e)))?;
        let value = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            ReadError::Persistence(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        Ok(Some(value))
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let path = self.path_for(key);
        // Replace atomically.
        let tmp = path.with_extension("json.tmp");

        let file = File::create(&tmp)
            .map_err(|e| ReadError::Persistence(format!("Failed to create {}: {}", tmp.display(), e)))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &value)
            .map_err(|e| ReadError::Persistence(format!("Failed to write {}: {}", key, e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| ReadError::Persistence(format!("Failed to save {}: {}", key, e)))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| ReadError::Persistence(format!("Failed to remove {}: {}", key, e)))?;
        }
        Ok(())
    }
}

/// Non-durable store, for tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::open(temp_dir.path()).unwrap();

        assert_eq!(store.get("documents").unwrap(), None);
        store.set("documents", json!([{"id": "a"}])).unwrap();
        assert_eq!(store.get("documents").unwrap(), Some(json!([{"id": "a"}])));

        store.remove("documents").unwrap();
        assert_eq!(store.get("documents").unwrap(), None);
        store.remove("documents").unwrap();
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        JsonFileStore::open(temp_dir.path())
            .unwrap()
            .set("active_document", json!("abc"))
            .unwrap();

        let store = JsonFileStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.get("active_document").unwrap(), Some(json!("abc")));
    }

    #[test]
    fn test_file_store_sanitizes_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp_dir.path()).unwrap();
        let path = store.path_for("../escape/key");
        assert_eq!(path.parent(), Some(temp_dir.path()));
        assert!(path.ends_with("___escape_key.json"));
    }

    #[test]
    fn test_file_store_corrupt_value_is_persistence_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("documents.json"), b"{not json").unwrap();
        let store = JsonFileStore::open(temp_dir.path()).unwrap();
        assert!(matches!(
            store.get("documents"),
            Err(ReadError::Persistence(_))
        ));
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        store.set("k", json!(1)).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!(1)));
        assert_eq!(store.len(), 1);
        store.remove("k").unwrap();
        assert!(store.is_empty());
    }
}
