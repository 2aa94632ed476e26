//! Property-based tests for key classification and the cache index

use macroenv::cache::CacheIndex;
use macroenv::codec::parse_literal;
use macroenv::key::{canonical_key, classify, ScopeKind, KEY_SEPARATOR};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z_][A-Za-z0-9_]{0,8}",
        "[a-z]{1,6}\\.[A-Za-z]{1,6}",
        "[A-Za-z]{1,4}/[A-Za-z]{1,4}/[A-Za-z0-9]{1,3}\\.[A-Za-z]{1,6}",
        "[A-Za-z]{1,4}/[A-Za-z]{1,4}/[A-Za-z0-9]{1,3}\\.[a-z]{1,4}\\.[A-Za-z]{1,6}",
    ]
}

/// Classification splits every key into scope and leaf without losing text.
#[test]
fn test_classification_is_total_and_lossless() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&any::<String>(), |key| {
            let parsed = classify(&key);
            match parsed.kind {
                ScopeKind::Global => {
                    prop_assert!(!key.contains(KEY_SEPARATOR));
                    prop_assert_eq!(parsed.leaf, key.as_str());
                }
                ScopeKind::Macro | ScopeKind::Door => {
                    let rebuilt = format!("{}{}{}", parsed.scope, KEY_SEPARATOR, parsed.leaf);
                    prop_assert_eq!(rebuilt, key.clone());
                    prop_assert!(!parsed.scope.contains(KEY_SEPARATOR));
                }
            }
            prop_assert_eq!(classify(&key), parsed);
            Ok(())
        })
        .unwrap();
}

/// Canonicalization is idempotent and never changes the classification.
#[test]
fn test_canonical_key_is_idempotent() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&key_strategy(), |key| {
            let once = canonical_key(&key).into_owned();
            let twice = canonical_key(&once).into_owned();
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(classify(&once).kind, classify(&key).kind);
            prop_assert_eq!(classify(&once).leaf, classify(&key).leaf);
            Ok(())
        })
        .unwrap();
}

/// Replaying puts and removes incrementally gives the same index as
/// rebuilding from the final flat contents.
#[test]
fn test_incremental_cache_matches_rebuild() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let op = (key_strategy(), any::<Option<i32>>());

    runner
        .run(&prop::collection::vec(op, 0..40), |ops| {
            let mut incremental = CacheIndex::new();
            let mut flat: BTreeMap<String, Value> = BTreeMap::new();

            for (key, value) in ops {
                let key = canonical_key(&key).into_owned();
                match value {
                    Some(v) => {
                        incremental.put(&key, json!(v));
                        flat.insert(key, json!(v));
                    }
                    None => {
                        incremental.remove(&key);
                        flat.remove(&key);
                    }
                }
            }

            let rebuilt = CacheIndex::from_entries(flat.clone());
            prop_assert_eq!(incremental.len(), flat.len());
            prop_assert_eq!(incremental, rebuilt);
            Ok(())
        })
        .unwrap();
}

/// Integers written as text come back as numbers.
#[test]
fn test_decimal_integers_parse_as_numbers() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&any::<i64>(), |n| {
            prop_assert_eq!(parse_literal(&n.to_string()), Some(json!(n)));
            Ok(())
        })
        .unwrap();
}
