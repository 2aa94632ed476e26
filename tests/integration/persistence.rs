//! Durability: everything written survives a reopen and rebuilds the same index

use super::test_utils::{open_store, DOOR};
use macroenv::store::{DurableStore, SledEnvStore};
use macroenv::{EnvError, EnvironmentStore, Scope};
use serde_json::{json, Map};
use tempfile::TempDir;

#[test]
fn test_values_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = open_store(&dir);
        store.set("ScanID", "7").unwrap();
        store.set("ascan.ScanFile", "'a.h5'").unwrap();
        store.set(&format!("{DOOR}.ascan.ScanFile"), "'b.h5'").unwrap();
        store.close().unwrap();
    }

    let store = open_store(&dir);
    assert_eq!(store.get("ScanID", Scope::global()).unwrap(), json!(7));
    assert_eq!(
        store.get("ScanFile", Scope::for_door_macro(DOOR, "ascan")).unwrap(),
        json!("b.h5")
    );
    assert!(store.is_consistent().unwrap());
}

#[test]
fn test_unset_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = open_store(&dir);
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.unset("a").unwrap();
        store.close().unwrap();
    }

    let store = open_store(&dir);
    assert!(!store.has("a", Scope::global()));
    assert_eq!(store.get("b", Scope::global()).unwrap(), json!(2));
}

#[test]
fn test_structured_values_round_trip_through_disk() {
    let dir = TempDir::new().unwrap();
    {
        let store = open_store(&dir);
        store
            .set("Motors", "['mot01', 'mot02', {'speed': 1.5, 'on': True}]")
            .unwrap();
        store.close().unwrap();
    }
    let store = open_store(&dir);
    assert_eq!(
        store.get("Motors", Scope::global()).unwrap(),
        json!(["mot01", "mot02", {"speed": 1.5, "on": true}])
    );
}

#[test]
fn test_reload_picks_up_external_writes() {
    let dir = TempDir::new().unwrap();
    let durable = SledEnvStore::open(dir.path().join("env.db")).unwrap();
    let db = durable.db().clone();
    let store = EnvironmentStore::with_store(Box::new(durable)).unwrap();

    db.insert("ScanDir", serde_json::to_vec(&json!("/ext")).unwrap())
        .unwrap();
    assert!(!store.has("ScanDir", Scope::global()));
    assert!(!store.is_consistent().unwrap());

    store.reload().unwrap();
    assert_eq!(store.get("ScanDir", Scope::global()).unwrap(), json!("/ext"));
    assert!(store.is_consistent().unwrap());
}

#[test]
fn test_corrupt_entry_is_reported() {
    let dir = TempDir::new().unwrap();
    let durable = SledEnvStore::open(dir.path().join("env.db")).unwrap();
    durable.db().insert("broken", b"{not json".to_vec()).unwrap();

    let err = EnvironmentStore::with_store(Box::new(durable)).err().unwrap();
    assert!(matches!(
        err,
        EnvError::Storage(macroenv::StorageError::Corrupt { .. })
    ));
}

#[test]
fn test_durable_snapshot_matches_flat_view() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("env.db");
    {
        let store = EnvironmentStore::open(&path).unwrap();
        let mut batch = Map::new();
        batch.insert("x".into(), json!("1"));
        batch.insert("m.y".into(), json!("2"));
        store.set_batch(batch).unwrap();
        store.close().unwrap();
    }
    let durable = SledEnvStore::open(&path).unwrap();
    let snapshot = durable.snapshot().unwrap();
    assert_eq!(snapshot.get("x"), Some(&json!(1)));
    assert_eq!(snapshot.get("m.y"), Some(&json!(2)));
}

#[test]
fn test_open_reports_path() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let path = store.path().unwrap();
    assert!(path.is_absolute());
    assert!(path.ends_with("env.db"));
}

/// Write `entries` straight into the file, bypassing key canonicalization.
fn seed_file(dir: &TempDir, entries: &[(&str, serde_json::Value)]) {
    let durable = SledEnvStore::open(dir.path().join("env.db")).unwrap();
    for (key, value) in entries {
        durable.put(key, value).unwrap();
    }
    durable.flush().unwrap();
}

fn stored_keys(store: &EnvironmentStore) -> Vec<String> {
    store
        .get_all(Scope::global())
        .unwrap()
        .keys()
        .cloned()
        .collect()
}

#[test]
fn test_unset_mixed_case_door_key_from_file() {
    let dir = TempDir::new().unwrap();
    seed_file(&dir, &[("BL/Door/01.x", json!(1))]);

    let store = open_store(&dir);
    assert_eq!(store.get("x", Scope::for_door(DOOR)).unwrap(), json!(1));
    store.unset("BL/Door/01.x").unwrap();
    assert!(stored_keys(&store).is_empty());
    assert!(store.is_consistent().unwrap());
    store.close().unwrap();

    let store = open_store(&dir);
    assert!(!store.has("x", Scope::for_door(DOOR)));
}

#[test]
fn test_set_over_mixed_case_door_key_from_file() {
    let dir = TempDir::new().unwrap();
    seed_file(&dir, &[("BL/Door/01.x", json!("old"))]);

    let store = open_store(&dir);
    store.set("BL/Door/01.x", "'new'").unwrap();
    assert_eq!(store.get("x", Scope::for_door(DOOR)).unwrap(), json!("new"));
    assert_eq!(stored_keys(&store), vec![format!("{DOOR}.x")]);
    assert!(store.is_consistent().unwrap());

    store.unset("BL/Door/01.x").unwrap();
    assert!(store.is_consistent().unwrap());
    store.close().unwrap();

    let store = open_store(&dir);
    assert!(!store.has("x", Scope::for_door(DOOR)));
    assert!(stored_keys(&store).is_empty());
}

#[test]
fn test_set_collapses_door_key_spellings_from_file() {
    let dir = TempDir::new().unwrap();
    seed_file(
        &dir,
        &[
            ("BL/DOOR/01.x", json!(1)),
            ("Bl/Door/01.x", json!(2)),
            ("bl/door/01.y", json!(3)),
        ],
    );

    let store = open_store(&dir);
    store.set("bl/door/01.x", "4").unwrap();
    assert_eq!(
        stored_keys(&store),
        vec![format!("{DOOR}.x"), format!("{DOOR}.y")]
    );
    assert!(store.is_consistent().unwrap());
    store.close().unwrap();

    let durable = SledEnvStore::open(dir.path().join("env.db")).unwrap();
    let snapshot = durable.snapshot().unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.get("bl/door/01.x"), Some(&json!(4)));
}
