//! Durable Environment Store
//!
//! The authoritative, on-disk copy of the environment: a flat, ordered map from
//! compound key to value. Every mutating call is synced before it returns.

pub mod persistence;

pub use persistence::SledEnvStore;

use crate::error::StorageError;
use serde_json::{Map, Value};

/// Durable environment store interface
pub trait DurableStore: Send + Sync {
    /// Every `(key, value)` pair in key order.
    fn scan(&self) -> Result<Vec<(String, Value)>, StorageError>;

    fn contains(&self, key: &str) -> Result<bool, StorageError>;

    /// Write `key` and sync before returning.
    fn put(&self, key: &str, value: &Value) -> Result<(), StorageError>;

    /// Delete `key` and sync before returning. Returns the previous value.
    fn remove(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Force all pending writes to disk.
    fn flush(&self) -> Result<(), StorageError>;

    /// Flat copy of the full contents.
    fn snapshot(&self) -> Result<Map<String, Value>, StorageError> {
        Ok(self.scan()?.into_iter().collect())
    }
}
