//! Environment Cache Index
//!
//! In-memory view of the durable environment split into global, per-macro and
//! per-door maps. Built in one pass over the durable store and then updated
//! key by key alongside every durable mutation.

use crate::key::{canonical_key, classify, normalize_door, ScopeKind};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// Properties of one scope: leaf key -> value
pub type ScopeEnv = HashMap<String, Value>;

/// Cache index over the durable environment
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheIndex {
    global: ScopeEnv,
    macros: HashMap<String, ScopeEnv>,
    /// Keyed by normalized door name.
    doors: HashMap<String, ScopeEnv>,
    /// Canonical key -> non-canonical spellings present in the durable store.
    spellings: HashMap<String, BTreeSet<String>>,
}

impl CacheIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a full scan of `(key, value)` pairs.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut index = Self::new();
        index.rebuild(entries);
        index
    }

    /// Reset all maps and repopulate them from `entries`.
    pub fn rebuild<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.global.clear();
        self.macros.clear();
        self.doors.clear();
        self.spellings.clear();
        for (key, value) in entries {
            self.put(&key, value);
        }
    }

    /// Insert or replace the value for a compound key.
    ///
    /// A key that differs from its canonical form is remembered as a stored
    /// spelling of that canonical key.
    pub fn put(&mut self, key: &str, value: Value) {
        let canonical = canonical_key(key);
        if canonical != key {
            self.spellings
                .entry(canonical.into_owned())
                .or_default()
                .insert(key.to_string());
        }
        let parsed = classify(key);
        let env = match parsed.kind {
            ScopeKind::Global => &mut self.global,
            ScopeKind::Macro => self.macros.entry(parsed.scope.to_string()).or_default(),
            ScopeKind::Door => self.doors.entry(normalize_door(parsed.scope)).or_default(),
        };
        env.insert(parsed.leaf.to_string(), value);
    }

    /// Remove a compound key. Missing keys are ignored.
    ///
    /// Any spelling of the key removes it, along with every stored spelling.
    /// Returns the removed value, if any. Emptied scopes are dropped.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.spellings.remove(canonical_key(key).as_ref());
        let parsed = classify(key);
        match parsed.kind {
            ScopeKind::Global => self.global.remove(parsed.leaf),
            ScopeKind::Macro => remove_scoped(&mut self.macros, parsed.scope, parsed.leaf),
            ScopeKind::Door => {
                remove_scoped(&mut self.doors, &normalize_door(parsed.scope), parsed.leaf)
            }
        }
    }

    pub fn global(&self) -> &ScopeEnv {
        &self.global
    }

    pub fn macro_env(&self, macro_name: &str) -> Option<&ScopeEnv> {
        self.macros.get(macro_name)
    }

    /// Door properties; the name is matched case-insensitively.
    pub fn door_env(&self, door_name: &str) -> Option<&ScopeEnv> {
        self.doors.get(&normalize_door(door_name))
    }

    /// Non-canonical spellings under which `key` is stored durably.
    pub fn stored_spellings(&self, key: &str) -> Vec<String> {
        self.spellings
            .get(canonical_key(key).as_ref())
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Forget one non-canonical spelling after it left the durable store.
    pub fn forget_spelling(&mut self, spelling: &str) {
        let canonical = canonical_key(spelling).into_owned();
        if let Some(keys) = self.spellings.get_mut(&canonical) {
            keys.remove(spelling);
            if keys.is_empty() {
                self.spellings.remove(&canonical);
            }
        }
    }

    /// Total number of properties across all scopes.
    pub fn len(&self) -> usize {
        self.global.len()
            + self.macros.values().map(HashMap::len).sum::<usize>()
            + self.doors.values().map(HashMap::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn remove_scoped(
    scopes: &mut HashMap<String, ScopeEnv>,
    scope: &str,
    leaf: &str,
) -> Option<Value> {
    let env = scopes.get_mut(scope)?;
    let removed = env.remove(leaf);
    if env.is_empty() {
        scopes.remove(scope);
    }
    removed
}
