//! Error types for the macro environment store.

use serde_json::{Map, Value};
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Corrupt environment entry {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Broadcast transport errors
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Listener channel disconnected")]
    Disconnected,

    #[error("Broadcast rejected: {0}")]
    Rejected(String),
}

/// Errors surfaced by the environment API
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("Unknown environment {0}")]
    UnknownEnvironment(String),

    #[error("Malformed key '{key}': {reason}")]
    MalformedKey { key: String, reason: String },

    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The keys in `written` were persisted; only listener delivery failed.
    #[error("Environment persisted but listeners were not informed: {source}")]
    Notification {
        written: Map<String, Value>,
        #[source]
        source: NotifyError,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EnvError {
    pub(crate) fn malformed(key: &str, reason: impl Into<String>) -> Self {
        EnvError::MalformedKey {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// True when the durable store holds the requested mutation regardless of this error.
    pub fn is_persisted(&self) -> bool {
        matches!(self, EnvError::Notification { .. })
    }
}

impl From<config::ConfigError> for EnvError {
    fn from(err: config::ConfigError) -> Self {
        EnvError::Config(err.to_string())
    }
}
