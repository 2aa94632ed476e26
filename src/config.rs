//! Configuration System
//!
//! Layered configuration for the environment store: built-in defaults, the
//! user's global file, workspace files and finally `MACROENV__*` environment
//! variables, each layer overriding the previous one.

use crate::error::EnvError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

mod merge;
mod sources;

use merge::merge_policy;
use sources::{environment, global_file, workspace_file};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Durable storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Change notification settings
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the environment lives on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Environment file; relative paths resolve against the workspace root.
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            env_file: default_env_file(),
        }
    }
}

/// Default environment file: the per-user data directory when one is known.
pub fn default_env_file() -> PathBuf {
    directories::ProjectDirs::from("", "", "macroenv")
        .map(|dirs| dirs.data_dir().join("env.db"))
        .unwrap_or_else(|| PathBuf::from(".macroenv/env.db"))
}

impl StorageConfig {
    /// Absolute environment file path for the given workspace.
    pub fn resolve_env_file(&self, workspace_root: &Path) -> PathBuf {
        if self.env_file.is_absolute() {
            self.env_file.clone()
        } else {
            workspace_root.join(&self.env_file)
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.env_file.as_os_str().is_empty() {
            return Err("Environment file path cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Broadcast settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Routing tag attached to change events
    #[serde(default)]
    pub tag: String,
}

impl EnvConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), EnvError> {
        self.storage
            .validate()
            .map_err(|e| EnvError::Config(format!("storage: {}", e)))?;
        self.logging
            .validate()
            .map_err(|e| EnvError::Config(format!("logging: {}", e)))?;
        Ok(())
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, EnvError> {
        toml::to_string_pretty(self).map_err(|e| EnvError::Config(e.to_string()))
    }
}

/// Loads `EnvConfig` from its layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (highest last): defaults, global file, `config/config.toml`,
    /// `config/{MACROENV_ENV}.toml`, `MACROENV__*` environment variables.
    pub fn load(workspace_root: &Path) -> Result<EnvConfig, EnvError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);
        let config: EnvConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        debug!(env_file = %config.storage.env_file.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load a single file on top of the defaults.
    pub fn load_from_file(path: &Path) -> Result<EnvConfig, EnvError> {
        if !path.exists() {
            return Err(EnvError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let config: EnvConfig = merge_policy::builder_with_defaults()?
            .add_source(config::File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
