//! CLI route: single route table and run context. Dispatches to the environment
//! store and presentation.

use crate::cli::help::{command_name, is_mutation};
use crate::cli::parse::Commands;
use crate::cli::presentation::{format_check_result, format_env, format_value, format_written};
use crate::config::{ConfigLoader, EnvConfig};
use crate::environment::{BatchInput, EnvironmentStore};
use crate::error::{EnvError, NotifyError};
use crate::key::{classify, is_compound_leaf, ScopeKind};
use crate::notify::EnvironmentEvent;
use crate::resolver::Scope;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// Runtime context for CLI execution: effective config and the open store.
pub struct RunContext {
    store: EnvironmentStore,
    config: EnvConfig,
}

/// Listeners of a CLI session are the log records.
fn log_event(event: &EnvironmentEvent) -> Result<(), NotifyError> {
    info!(event = %event.to_wire(), "Environment changed");
    Ok(())
}

impl RunContext {
    /// Load configuration (from `config_path` alone when given, else the
    /// layered sources of `workspace_root`), apply overrides and open the store.
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        env_file: Option<PathBuf>,
        tag: Option<String>,
    ) -> Result<Self, EnvError> {
        let mut config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        if let Some(env_file) = env_file {
            config.storage.env_file = env_file;
        }
        if let Some(tag) = tag {
            config.notify.tag = tag;
        }
        config.storage.env_file = config.storage.resolve_env_file(&workspace_root);

        let store = EnvironmentStore::open(&config.storage.env_file)?
            .with_tag(config.notify.tag.clone())
            .with_broadcaster(log_event);

        Ok(Self { store, config })
    }

    pub fn store(&self) -> &EnvironmentStore {
        &self.store
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Flush and release the environment file.
    pub fn close(self) -> Result<(), EnvError> {
        self.store.close()
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, EnvError> {
        let started = Instant::now();
        let result = self.execute_inner(command);
        debug!(
            command = command_name(command),
            mutation = is_mutation(command),
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, EnvError> {
        match command {
            Commands::Get {
                name,
                macro_name,
                door,
                format,
            } => {
                let scope = Scope::new(macro_name.as_deref(), door.as_deref());
                format_value(&self.store.get(name, scope)?, format)
            }
            Commands::Has {
                name,
                macro_name,
                door,
            } => {
                let scope = Scope::new(macro_name.as_deref(), door.as_deref());
                Ok(self.store.has(name, scope).to_string())
            }
            Commands::List {
                macro_name,
                door,
                format,
            } => {
                let scope = Scope::new(macro_name.as_deref(), door.as_deref());
                let env = self.store.get_all(scope)?;
                format_env(
                    &scope_title(macro_name.as_deref(), door.as_deref()),
                    &env,
                    format,
                )
            }
            Commands::Set { key, value } => {
                let (key, stored) = self.store.set(key, value.as_str())?;
                Ok(format!("{} = {}", key, stored))
            }
            Commands::SetBatch { pairs } => {
                let tokens = pairs.iter().cloned().map(Value::String).collect();
                let written = self.store.set_batch(BatchInput::Pairs(tokens))?;
                Ok(format_written(&written))
            }
            Commands::Unset { keys } => {
                self.store.unset_many(keys)?;
                Ok(format!("Removed {} key(s)", keys.len()))
            }
            Commands::Lookup {
                door,
                macro_name,
                keys,
                format,
            } => {
                let names: Vec<&str> = keys.iter().map(String::as_str).collect();
                let filter = if names.is_empty() {
                    None
                } else {
                    Some(names.as_slice())
                };
                let env = self.store.get_door_macro_env(door, macro_name, filter)?;
                let title = scope_title(Some(macro_name.as_str()), Some(door.as_str()));
                format_env(&title, &env, format)
            }
            Commands::Property { key } => {
                let parsed = classify(key);
                let value = match parsed.kind {
                    ScopeKind::Door if is_compound_leaf(parsed.leaf) => {
                        self.store.get_door_macro_property(key)?
                    }
                    ScopeKind::Door => self.store.get_door_property(key)?,
                    ScopeKind::Macro => self.store.get_macro_property(key)?,
                    ScopeKind::Global => {
                        return Err(EnvError::malformed(
                            key,
                            "property lookups need a macro or door scope",
                        ))
                    }
                };
                let value = value.ok_or_else(|| EnvError::UnknownEnvironment(key.clone()))?;
                format_value(&value, "text")
            }
            Commands::Check => {
                let consistent = self.store.is_consistent()?;
                let entries = self.store.get_all(Scope::global())?.len();
                Ok(format_check_result(consistent, entries))
            }
            Commands::Config => self.config.to_toml(),
        }
    }
}

fn scope_title(macro_name: Option<&str>, door: Option<&str>) -> String {
    match (macro_name, door) {
        (None, None) => "Environment".to_string(),
        (Some(m), None) => format!("Environment of macro {}", m),
        (None, Some(d)) => format!("Environment of door {}", d),
        (Some(m), Some(d)) => format!("Environment of macro {} on door {}", m, d),
    }
}
