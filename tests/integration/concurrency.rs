//! Shared-handle concurrency: readers never observe a write half applied

use super::test_utils::{open_store, DOOR};
use macroenv::{EnvironmentStore, Scope};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

const WRITERS: usize = 4;
const WRITES_PER_THREAD: usize = 50;

#[test]
fn test_parallel_writers_leave_consistent_index() {
    let dir = TempDir::new().unwrap();
    let store: Arc<EnvironmentStore> = Arc::new(open_store(&dir));

    let handles: Vec<_> = (0..WRITERS)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..WRITES_PER_THREAD {
                    store.set(&format!("m{t}.k{i}"), i.to_string()).unwrap();
                    store
                        .set(&format!("{DOOR}.m{t}.k{i}"), (i * 10).to_string())
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(store.is_consistent().unwrap());
    assert_eq!(
        store.get_all(Scope::global()).unwrap().len(),
        WRITERS * WRITES_PER_THREAD * 2
    );
    for t in 0..WRITERS {
        let macro_name = format!("m{t}");
        assert_eq!(
            store
                .get("k3", Scope::for_door_macro(DOOR, &macro_name))
                .unwrap(),
            json!(30)
        );
        assert_eq!(
            store.get("k3", Scope::for_macro(&macro_name)).unwrap(),
            json!(3)
        );
    }
}

#[test]
fn test_readers_see_whole_values_during_writes() {
    let dir = TempDir::new().unwrap();
    let store: Arc<EnvironmentStore> = Arc::new(open_store(&dir));
    store.set("Counter", "0").unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut last = 0;
            while !done.load(Ordering::Acquire) {
                let value = store.get("Counter", Scope::global()).unwrap();
                let n = value.as_u64().unwrap();
                assert!(n >= last, "counter went backwards: {n} < {last}");
                last = n;
            }
        })
    };

    for i in 1..=100u64 {
        store.set("Counter", i.to_string()).unwrap();
    }
    done.store(true, Ordering::Release);
    reader.join().unwrap();

    assert_eq!(store.get("Counter", Scope::global()).unwrap(), json!(100));
    assert!(store.is_consistent().unwrap());
}

#[test]
fn test_concurrent_unset_of_same_key_succeeds_once() {
    let dir = TempDir::new().unwrap();
    let store: Arc<EnvironmentStore> = Arc::new(open_store(&dir));
    store.set("Shared", "1").unwrap();

    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.unset("Shared").is_ok())
        })
        .collect();
    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 1);
    assert!(!store.has("Shared", Scope::global()));
}
