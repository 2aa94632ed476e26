//! Sled-backed durable environment store

use crate::error::StorageError;
use crate::store::DurableStore;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Sled-based implementation of DurableStore
pub struct SledEnvStore {
    db: sled::Db,
    path: PathBuf,
}

impl SledEnvStore {
    /// Open or create the environment database at `path`.
    ///
    /// A missing parent directory is created first; failing to create it is
    /// an error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = absolute(path.as_ref())?;
        if let Some(parent) = path.parent() {
            if !parent.is_dir() {
                info!(dir = %parent.display(), "Creating environment directory");
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = sled::open(&path).map_err(|e| {
            StorageError::IoError(io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to open environment database {}: {}", path.display(), e),
            ))
        })?;
        info!(path = %path.display(), "Environment is being stored");
        Ok(Self { db, path })
    }

    /// Absolute path of the environment database.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the underlying sled database (for advanced operations)
    pub fn db(&self) -> &sled::Db {
        &self.db
    }
}

impl DurableStore for SledEnvStore {
    fn scan(&self) -> Result<Vec<(String, Value)>, StorageError> {
        let mut entries = Vec::new();
        for item in self.db.iter() {
            let (key, value) = item.map_err(to_storage_io)?;
            let key = String::from_utf8(key.to_vec()).map_err(|e| StorageError::Corrupt {
                key: String::from_utf8_lossy(e.as_bytes()).into_owned(),
                reason: "key is not valid UTF-8".to_string(),
            })?;
            let value = decode(&key, &value)?;
            entries.push((key, value));
        }
        Ok(entries)
    }

    fn contains(&self, key: &str) -> Result<bool, StorageError> {
        self.db.contains_key(key.as_bytes()).map_err(to_storage_io)
    }

    fn put(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let raw = serde_json::to_vec(value).map_err(to_storage_data)?;
        self.db.insert(key.as_bytes(), raw).map_err(to_storage_io)?;
        self.flush()
    }

    fn remove(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let previous = self.db.remove(key.as_bytes()).map_err(to_storage_io)?;
        self.flush()?;
        previous.map(|raw| decode(key, &raw)).transpose()
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(to_storage_io)?;
        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf, StorageError> {
    if path.as_os_str().is_empty() {
        return Err(StorageError::InvalidPath(
            "environment path cannot be empty".to_string(),
        ));
    }
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn decode(key: &str, raw: &[u8]) -> Result<Value, StorageError> {
    serde_json::from_slice(raw).map_err(|e| StorageError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
}

fn to_storage_data(err: serde_json::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
}
