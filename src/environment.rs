//! Environment Store
//!
//! The store object hosts create once and share by handle. It owns the durable
//! store, the cache index built from it, the value encoder and the broadcaster.
//!
//! All mutations run under one exclusive lock that covers both the durable write
//! and the matching cache update, so readers (which take the shared lock) never
//! see one without the other. Listeners are notified after the lock is released.

use crate::cache::CacheIndex;
use crate::codec::{LiteralEncoder, ValueEncoder};
use crate::error::EnvError;
use crate::key::{
    canonical_key, parse_door_macro_property, parse_door_property, parse_macro_property,
};
use crate::notify::{Broadcaster, EnvironmentEvent, NullBroadcaster};
use crate::resolver::{self, Scope};
use crate::store::{DurableStore, SledEnvStore};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Input accepted by [`EnvironmentStore::set_batch`].
#[derive(Debug, Clone)]
pub enum BatchInput {
    /// Alternating key, value tokens. Keys must be strings.
    Pairs(Vec<Value>),
    /// Key to raw value.
    Map(Map<String, Value>),
}

impl BatchInput {
    fn into_map(self) -> Result<Map<String, Value>, EnvError> {
        let map = match self {
            BatchInput::Map(map) => map,
            BatchInput::Pairs(tokens) => {
                if tokens.len() % 2 != 0 {
                    return Err(EnvError::InvalidBatch(format!(
                        "expected key/value pairs, got {} tokens",
                        tokens.len()
                    )));
                }
                let mut map = Map::new();
                let mut iter = tokens.into_iter();
                while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                    let Value::String(key) = key else {
                        return Err(EnvError::InvalidBatch(format!(
                            "keys must be strings, got {key}"
                        )));
                    };
                    map.insert(key, value);
                }
                map
            }
        };
        let map: Map<String, Value> = map
            .into_iter()
            .map(|(k, v)| (canonical_key(&k).into_owned(), v))
            .collect();
        if map.contains_key("") {
            return Err(EnvError::malformed("", "key cannot be empty"));
        }
        Ok(map)
    }
}

impl From<Map<String, Value>> for BatchInput {
    fn from(map: Map<String, Value>) -> Self {
        BatchInput::Map(map)
    }
}

impl From<Vec<Value>> for BatchInput {
    fn from(tokens: Vec<Value>) -> Self {
        BatchInput::Pairs(tokens)
    }
}

/// Durable, scoped environment with precedence resolution
pub struct EnvironmentStore {
    durable: Box<dyn DurableStore>,
    cache: RwLock<CacheIndex>,
    encoder: Box<dyn ValueEncoder>,
    broadcaster: Box<dyn Broadcaster>,
    tag: String,
    path: Option<PathBuf>,
}

impl EnvironmentStore {
    /// Open (or create) the environment file at `path` with the literal encoder
    /// and no listeners.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EnvError> {
        let durable = SledEnvStore::open(path)?;
        let path = durable.path().to_path_buf();
        let mut store = Self::with_store(Box::new(durable))?;
        store.path = Some(path);
        Ok(store)
    }

    /// Build a store over any durable backend and load its contents.
    pub fn with_store(durable: Box<dyn DurableStore>) -> Result<Self, EnvError> {
        let cache = CacheIndex::from_entries(durable.scan()?);
        info!(entries = cache.len(), "Environment loaded");
        Ok(Self {
            durable,
            cache: RwLock::new(cache),
            encoder: Box::new(LiteralEncoder),
            broadcaster: Box::new(NullBroadcaster),
            tag: String::new(),
            path: None,
        })
    }

    pub fn with_broadcaster(mut self, broadcaster: impl Broadcaster + 'static) -> Self {
        self.broadcaster = Box::new(broadcaster);
        self
    }

    pub fn with_encoder(mut self, encoder: impl ValueEncoder + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    /// Routing tag attached to every broadcast event.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Path of the environment file, when backed by one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Flush the durable store and release the handle.
    pub fn close(self) -> Result<(), EnvError> {
        let _guard = self.cache.write();
        self.durable.flush()?;
        info!("Environment closed");
        Ok(())
    }

    /// Discard the cache and rebuild it from a full durable scan.
    pub fn reload(&self) -> Result<(), EnvError> {
        let mut cache = self.cache.write();
        cache.rebuild(self.durable.scan()?);
        info!(entries = cache.len(), "Environment reloaded");
        Ok(())
    }

    /// True when the cache matches a fresh rebuild from the durable store.
    pub fn is_consistent(&self) -> Result<bool, EnvError> {
        let cache = self.cache.read();
        let fresh = CacheIndex::from_entries(self.durable.scan()?);
        Ok(*cache == fresh)
    }

    // ----- reads -----

    /// Value of `name` along the precedence chain for `scope`.
    pub fn get(&self, name: &str, scope: Scope<'_>) -> Result<Value, EnvError> {
        resolver::resolve(&self.cache.read(), name, scope)
    }

    pub fn has(&self, name: &str, scope: Scope<'_>) -> bool {
        resolver::exists(&self.cache.read(), name, scope)
    }

    /// Composite environment for `scope`; the flat stored contents when unscoped.
    pub fn get_all(&self, scope: Scope<'_>) -> Result<Map<String, Value>, EnvError> {
        let cache = self.cache.read();
        resolver::resolve_all(&cache, scope, || {
            self.durable.snapshot().map_err(EnvError::from)
        })
    }

    /// Environment of a macro on a door, optionally restricted to `keys`.
    pub fn get_door_macro_env(
        &self,
        door: &str,
        macro_name: &str,
        keys: Option<&[&str]>,
    ) -> Result<Map<String, Value>, EnvError> {
        let cache = self.cache.read();
        match keys {
            None => Ok(resolver::door_macro_view(&cache, door, macro_name)),
            Some(keys) => resolver::door_macro_keys(&cache, door, macro_name, keys),
        }
    }

    /// Value stored under `<macro>.<name>`, if any.
    pub fn get_macro_property(&self, key: &str) -> Result<Option<Value>, EnvError> {
        let (macro_name, name) = parse_macro_property(key)?;
        let cache = self.cache.read();
        Ok(cache.macro_env(macro_name).and_then(|env| env.get(name)).cloned())
    }

    /// Value stored under `<door>.<name>`, if any.
    pub fn get_door_property(&self, key: &str) -> Result<Option<Value>, EnvError> {
        let (door, name) = parse_door_property(key)?;
        let cache = self.cache.read();
        Ok(cache.door_env(door).and_then(|env| env.get(name)).cloned())
    }

    /// Value stored under `<door>.<macro>.<name>`, if any.
    pub fn get_door_macro_property(&self, key: &str) -> Result<Option<Value>, EnvError> {
        let (door, leaf) = parse_door_macro_property(key)?;
        let cache = self.cache.read();
        Ok(cache.door_env(door).and_then(|env| env.get(leaf)).cloned())
    }

    // ----- mutations -----

    /// Encode and store one value; returns the stored key and value.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<(String, Value), EnvError> {
        let key = canonical_key(key).into_owned();
        let mut written = self.set_batch(BatchInput::Pairs(vec![
            Value::String(key.clone()),
            value.into(),
        ]))?;
        let stored = written.remove(&key).unwrap_or(Value::Null);
        Ok((key, stored))
    }

    /// Encode and store every pair, then broadcast one event for the batch.
    ///
    /// Not atomic: when a write fails the earlier writes of the batch stay
    /// applied and no event is sent. When only the broadcast fails the error is
    /// `EnvError::Notification`, which still carries the persisted values.
    pub fn set_batch(&self, input: impl Into<BatchInput>) -> Result<Map<String, Value>, EnvError> {
        let raw = input.into().into_map()?;
        let encoded = self.encoder.encode(raw);
        if encoded.is_empty() {
            return Ok(encoded);
        }

        {
            let mut cache = self.cache.write();
            for (key, value) in &encoded {
                self.write_one(&mut cache, key, value.clone())?;
            }
        }

        let event = EnvironmentEvent::new_environment(self.tag.clone(), &encoded);
        if let Err(source) = self.broadcaster.broadcast(&event) {
            warn!(keys = encoded.len(), error = %source, "Environment broadcast failed");
            return Err(EnvError::Notification {
                written: encoded,
                source,
            });
        }
        Ok(encoded)
    }

    /// Store `value` under `key` as given: no encoding, no notification.
    pub fn set_one(&self, key: &str, value: Value) -> Result<(), EnvError> {
        let mut cache = self.cache.write();
        self.write_one(&mut cache, &canonical_key(key), value)
    }

    /// Remove one key. Fails with `UnknownEnvironment` if it is not stored.
    pub fn unset(&self, key: &str) -> Result<(), EnvError> {
        let mut cache = self.cache.write();
        self.remove_one(&mut cache, key)
    }

    /// Remove keys in order; the first failure stops the rest.
    pub fn unset_many<I, K>(&self, keys: I) -> Result<(), EnvError>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut cache = self.cache.write();
        for key in keys {
            self.remove_one(&mut cache, key.as_ref())?;
        }
        Ok(())
    }

    /// `key` is canonical. Older spellings of it are dropped once the new
    /// value is durable.
    fn write_one(&self, cache: &mut CacheIndex, key: &str, value: Value) -> Result<(), EnvError> {
        self.durable.put(key, &value)?;
        debug!(key, "Environment set");
        cache.put(key, value);
        for spelling in cache.stored_spellings(key) {
            self.durable.remove(&spelling)?;
            debug!(key = %spelling, "Environment spelling replaced");
            cache.forget_spelling(&spelling);
        }
        Ok(())
    }

    /// Removes the key under every spelling it is stored with.
    fn remove_one(&self, cache: &mut CacheIndex, key: &str) -> Result<(), EnvError> {
        let canonical = canonical_key(key).into_owned();
        let mut candidates = cache.stored_spellings(&canonical);
        candidates.push(canonical.clone());
        if key != canonical && !candidates.iter().any(|c| c == key) {
            candidates.push(key.to_string());
        }

        let mut removed = 0;
        for candidate in &candidates {
            if self.durable.contains(candidate)? {
                self.durable.remove(candidate)?;
                removed += 1;
            }
        }
        if removed == 0 {
            return Err(EnvError::UnknownEnvironment(key.to_string()));
        }
        debug!(key = %canonical, spellings = removed, "Environment unset");
        cache.remove(&canonical);
        Ok(())
    }
}
