//! Macroenv: Hierarchical Macro Environment Store
//!
//! A namespaced key-value environment for macros and doors. Values live in
//! global, per-macro and per-door scopes, resolve through a fixed precedence
//! chain, persist to an embedded database and announce changes to listeners.

pub mod cache;
pub mod cli;
pub mod codec;
pub mod config;
pub mod environment;
pub mod error;
pub mod key;
pub mod logging;
pub mod notify;
pub mod resolver;
pub mod store;

pub use environment::{BatchInput, EnvironmentStore};
pub use error::{EnvError, NotifyError, StorageError};
pub use resolver::Scope;
