//! Compound key classification
//!
//! Environment keys are dot-separated. The first segment decides the scope:
//! no segment separator means a global property, a head that looks like a
//! three-part device name (`domain/family/member`) means a door property, and
//! anything else is a macro property.
//!
//! The door test is a string-shape heuristic. A macro whose name contains
//! exactly two `/` characters is indistinguishable from a door and will be
//! classified as one. Stored keys depend on this rule, so it is kept as is.

use crate::error::EnvError;
use std::borrow::Cow;

/// Separator between key segments.
pub const KEY_SEPARATOR: char = '.';

/// Separator inside a door (device) name.
pub const DOOR_NAME_SEPARATOR: char = '/';

/// Number of `DOOR_NAME_SEPARATOR` characters that mark a door name.
const DOOR_NAME_SEPARATOR_COUNT: usize = 2;

/// Scope a compound key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Macro,
    Door,
}

/// Result of classifying a compound key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedKey<'a> {
    pub kind: ScopeKind,
    /// Macro or door name; empty for global keys.
    pub scope: &'a str,
    /// Property name inside the scope. For doors this may itself contain dots.
    pub leaf: &'a str,
}

/// Returns true when `token` has the shape of a door (device) name.
pub fn is_door_name(token: &str) -> bool {
    token.matches(DOOR_NAME_SEPARATOR).count() == DOOR_NAME_SEPARATOR_COUNT
}

/// Canonical form of a door name used as a map key.
pub fn normalize_door(door: &str) -> String {
    door.to_lowercase()
}

/// Classify a compound key. Total: every string has exactly one classification.
pub fn classify(key: &str) -> ClassifiedKey<'_> {
    match key.split_once(KEY_SEPARATOR) {
        None => ClassifiedKey {
            kind: ScopeKind::Global,
            scope: "",
            leaf: key,
        },
        Some((head, tail)) if is_door_name(head) => ClassifiedKey {
            kind: ScopeKind::Door,
            scope: head,
            leaf: tail,
        },
        Some((head, tail)) => ClassifiedKey {
            kind: ScopeKind::Macro,
            scope: head,
            leaf: tail,
        },
    }
}

/// Key as it is persisted: door scopes are stored under their normalized name
/// so two spellings of one door can never coexist in the durable store.
pub fn canonical_key(key: &str) -> Cow<'_, str> {
    let parsed = classify(key);
    if parsed.kind == ScopeKind::Door && normalize_door(parsed.scope) != parsed.scope {
        Cow::Owned(format!(
            "{}{KEY_SEPARATOR}{}",
            normalize_door(parsed.scope),
            parsed.leaf
        ))
    } else {
        Cow::Borrowed(key)
    }
}

/// Returns true when `leaf` names a door+macro override (`<macro>.<name>`).
pub fn is_compound_leaf(leaf: &str) -> bool {
    leaf.contains(KEY_SEPARATOR)
}

/// Parse `<macro>.<name>`, rejecting any other shape.
pub fn parse_macro_property(key: &str) -> Result<(&str, &str), EnvError> {
    let parsed = classify(key);
    match parsed.kind {
        ScopeKind::Macro if !is_compound_leaf(parsed.leaf) => Ok((parsed.scope, parsed.leaf)),
        ScopeKind::Macro => Err(EnvError::malformed(
            key,
            "macro properties must have exactly two segments",
        )),
        ScopeKind::Door => Err(EnvError::malformed(key, "scope is a door name, not a macro")),
        ScopeKind::Global => Err(EnvError::malformed(key, "missing macro scope")),
    }
}

/// Parse `<door>.<name>` where `name` has no further segments.
pub fn parse_door_property(key: &str) -> Result<(&str, &str), EnvError> {
    let parsed = classify(key);
    match parsed.kind {
        ScopeKind::Door if !is_compound_leaf(parsed.leaf) => Ok((parsed.scope, parsed.leaf)),
        ScopeKind::Door => Err(EnvError::malformed(
            key,
            "door properties must have exactly two segments",
        )),
        _ => Err(EnvError::malformed(key, "scope is not a door name")),
    }
}

/// Parse `<door>.<macro>.<name>`; the part after the door is kept verbatim.
pub fn parse_door_macro_property(key: &str) -> Result<(&str, &str), EnvError> {
    let parsed = classify(key);
    match parsed.kind {
        ScopeKind::Door if is_compound_leaf(parsed.leaf) => Ok((parsed.scope, parsed.leaf)),
        ScopeKind::Door => Err(EnvError::malformed(key, "missing macro segment")),
        _ => Err(EnvError::malformed(key, "scope is not a door name")),
    }
}

/// Build the door-local leaf key for a door+macro override.
pub fn door_macro_leaf(macro_name: &str, name: &str) -> String {
    format!("{macro_name}{KEY_SEPARATOR}{name}")
}
