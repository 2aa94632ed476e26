//! Precedence resolution over the cache index.
//!
//! Point lookups walk a fixed chain from most to least specific scope:
//!
//! 1. door + macro override (`<door>.<macro>.<name>`)
//! 2. macro property (`<macro>.<name>`)
//! 3. door property (`<door>.<name>`)
//! 4. global property (`<name>`)
//!
//! A level counts as defined when the key is present, even if its value is null.
//! Composite views overlay whole scopes in the same order, lowest first.

use crate::cache::{CacheIndex, ScopeEnv};
use crate::error::EnvError;
use crate::key::{door_macro_leaf, is_compound_leaf, KEY_SEPARATOR};
use serde_json::{Map, Value};

/// Scope filter for a lookup. Empty names are treated as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scope<'a> {
    pub macro_name: Option<&'a str>,
    pub door_name: Option<&'a str>,
}

impl<'a> Scope<'a> {
    pub fn new(macro_name: Option<&'a str>, door_name: Option<&'a str>) -> Self {
        Self {
            macro_name: macro_name.filter(|m| !m.is_empty()),
            door_name: door_name.filter(|d| !d.is_empty()),
        }
    }

    pub fn global() -> Self {
        Self::default()
    }

    pub fn for_macro(macro_name: &'a str) -> Self {
        Self::new(Some(macro_name), None)
    }

    pub fn for_door(door_name: &'a str) -> Self {
        Self::new(None, Some(door_name))
    }

    pub fn for_door_macro(door_name: &'a str, macro_name: &'a str) -> Self {
        Self::new(Some(macro_name), Some(door_name))
    }
}

/// First value defined along the precedence chain, if any.
pub fn lookup<'c>(cache: &'c CacheIndex, name: &str, scope: Scope<'_>) -> Option<&'c Value> {
    if let (Some(door), Some(macro_name)) = (scope.door_name, scope.macro_name) {
        let leaf = door_macro_leaf(macro_name, name);
        if let Some(v) = cache.door_env(door).and_then(|env| env.get(&leaf)) {
            return Some(v);
        }
    }
    if let Some(macro_name) = scope.macro_name {
        if let Some(v) = cache.macro_env(macro_name).and_then(|env| env.get(name)) {
            return Some(v);
        }
    }
    if let Some(door) = scope.door_name {
        if let Some(v) = cache.door_env(door).and_then(|env| env.get(name)) {
            return Some(v);
        }
    }
    cache.global().get(name)
}

/// Resolve `name` for the given scope or fail with `UnknownEnvironment`.
pub fn resolve(cache: &CacheIndex, name: &str, scope: Scope<'_>) -> Result<Value, EnvError> {
    lookup(cache, name, scope)
        .cloned()
        .ok_or_else(|| EnvError::UnknownEnvironment(name.to_string()))
}

pub fn exists(cache: &CacheIndex, name: &str, scope: Scope<'_>) -> bool {
    lookup(cache, name, scope).is_some()
}

/// Composite view for a scope.
///
/// With no door and no macro the answer is the flat durable contents, which the
/// cache does not hold; `full_snapshot` supplies it.
pub fn resolve_all<F, E>(
    cache: &CacheIndex,
    scope: Scope<'_>,
    full_snapshot: F,
) -> Result<Map<String, Value>, E>
where
    F: FnOnce() -> Result<Map<String, Value>, E>,
{
    match (scope.door_name, scope.macro_name) {
        (None, None) => full_snapshot(),
        (Some(door), None) => Ok(door_view(cache, door)),
        (None, Some(macro_name)) => Ok(macro_view(cache, macro_name)),
        (Some(door), Some(macro_name)) => Ok(door_macro_view(cache, door, macro_name)),
    }
}

/// Globals overlaid with the door's own (non macro-specific) properties.
pub fn door_view(cache: &CacheIndex, door: &str) -> Map<String, Value> {
    let mut view = copy_env(cache.global());
    if let Some(env) = cache.door_env(door) {
        overlay_door_globals(&mut view, env);
    }
    view
}

/// Macro properties only; globals are not merged in.
pub fn macro_view(cache: &CacheIndex, macro_name: &str) -> Map<String, Value> {
    cache.macro_env(macro_name).map(copy_env).unwrap_or_default()
}

/// Full effective environment of a macro running on a door.
pub fn door_macro_view(cache: &CacheIndex, door: &str, macro_name: &str) -> Map<String, Value> {
    let mut view = copy_env(cache.global());
    let door_env = cache.door_env(door);

    if let Some(env) = door_env {
        overlay_door_globals(&mut view, env);
    }
    if let Some(env) = cache.macro_env(macro_name) {
        view.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    if let Some(env) = door_env {
        for (leaf, value) in env {
            let Some((prefix, name)) = leaf.split_once(KEY_SEPARATOR) else {
                continue;
            };
            if prefix == macro_name {
                view.insert(name.to_string(), value.clone());
            }
        }
    }
    view
}

/// Per-key resolution for a door+macro pair. Keys nobody defines are omitted.
pub fn door_macro_keys(
    cache: &CacheIndex,
    door: &str,
    macro_name: &str,
    keys: &[&str],
) -> Result<Map<String, Value>, EnvError> {
    let mut out = Map::new();
    for key in keys {
        if is_compound_leaf(key) {
            return Err(EnvError::malformed(key, "lookup keys must not contain '.'"));
        }
        if let Some(v) = lookup(cache, key, Scope::for_door_macro(door, macro_name)) {
            out.insert(key.to_string(), v.clone());
        }
    }
    Ok(out)
}

fn copy_env(env: &ScopeEnv) -> Map<String, Value> {
    env.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn overlay_door_globals(view: &mut Map<String, Value>, door_env: &ScopeEnv) {
    for (leaf, value) in door_env {
        if !is_compound_leaf(leaf) {
            view.insert(leaf.clone(), value.clone());
        }
    }
}
