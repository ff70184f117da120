// Preference storage
// Small string key/value store for front-end preferences

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Error types for storage operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// File I/O error
    IoError(String),
    /// JSON serialization/deserialization error
    JsonError(String),
    /// Invalid data format
    InvalidData(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::IoError(msg) => write!(f, "IO Error: {}", msg),
            StorageError::JsonError(msg) => write!(f, "JSON Error: {}", msg),
            StorageError::InvalidData(msg) => write!(f, "Invalid Data: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

/// Key/value preference store
pub trait Storage: Send + Sync {
    /// Read a value, `None` when the key was never written
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self
            .values
            .lock()
            .map_err(|e| StorageError::IoError(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| StorageError::IoError(e.to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// On-disk layout of the preferences file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PreferencesData {
    /// Format version
    version: u32,
    values: HashMap<String, String>,
}

/// JSON file store; every write rewrites the whole file
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Store backed by `path`; the file is created on first write
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// Default preferences file in the user's home directory or current directory
    pub fn default_path() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            let mut path = PathBuf::from(home);
            path.push(".rinconcito");
            path.push("preferences.json");
            path
        } else {
            PathBuf::from("preferences.json")
        }
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let json =
            fs::read_to_string(&self.path).map_err(|e| StorageError::IoError(e.to_string()))?;
        let data: PreferencesData =
            serde_json::from_str(&json).map_err(|e| StorageError::JsonError(e.to_string()))?;

        if data.version != 1 {
            return Err(StorageError::InvalidData(format!(
                "Unsupported preferences version: {}",
                data.version
            )));
        }

        Ok(data.values)
    }

    fn save(&self, values: HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StorageError::IoError(e.to_string()))?;
            }
        }

        let data = PreferencesData { version: 1, values };
        let json = serde_json::to_string_pretty(&data)
            .map_err(|e| StorageError::JsonError(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| StorageError::IoError(e.to_string()))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StorageError::IoError(e.to_string()))?;
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StorageError::IoError(e.to_string()))?;
        let mut values = self.load()?;
        values.insert(key.to_string(), value.to_string());
        self.save(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("theme").unwrap(), None);
        storage.set("theme", "dark").unwrap();
        assert_eq!(storage.get("theme").unwrap(), Some("dark".to_string()));
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.json");

        FileStorage::new(&path).set("theme", "dark").unwrap();
        FileStorage::new(&path).set("other", "1").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("theme").unwrap(), Some("dark".to_string()));
        assert_eq!(reopened.get("other").unwrap(), Some("1".to_string()));
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(FileStorage::new(&path).get("theme").unwrap(), None);
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), r#"{"version": 7, "values": {}}"#).unwrap();

        let err = FileStorage::new(temp_file.path()).get("theme").unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));
    }

    #[test]
    fn test_corrupt_file_is_json_error() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "not json").unwrap();

        let err = FileStorage::new(temp_file.path()).get("theme").unwrap_err();
        assert!(matches!(err, StorageError::JsonError(_)));
    }
}
