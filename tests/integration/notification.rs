//! Change events: one per non-empty batch, sent after the write is durable

use super::test_utils::DOOR;
use macroenv::notify::{ChannelBroadcaster, EnvironmentEvent, EVENT_TYPE_FIELD};
use macroenv::{EnvError, EnvironmentStore, NotifyError, Scope};
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use tempfile::TempDir;

fn open_with_channel(
    dir: &TempDir,
) -> (EnvironmentStore, std::sync::mpsc::Receiver<EnvironmentEvent>) {
    let (bus, rx) = ChannelBroadcaster::new_pair();
    let store = EnvironmentStore::open(dir.path().join("env.db"))
        .unwrap()
        .with_tag("ms01")
        .with_broadcaster(bus);
    (store, rx)
}

#[test]
fn test_batch_sends_single_tagged_event() {
    let dir = TempDir::new().unwrap();
    let (store, rx) = open_with_channel(&dir);

    store
        .set_batch(vec![
            json!("ScanDir"),
            json!("'/tmp'"),
            json!(format!("{DOOR}.ScanID")),
            json!("3"),
        ])
        .unwrap();

    let event = rx.try_recv().unwrap();
    assert!(rx.try_recv().is_err(), "exactly one event per batch");
    assert_eq!(event.tag, "ms01");
    assert_eq!(event.payload.get(EVENT_TYPE_FIELD), Some(&json!("new")));
    assert_eq!(event.payload.get("ScanDir"), Some(&json!("/tmp")));
    assert_eq!(event.payload.get(&format!("{DOOR}.ScanID")), Some(&json!(3)));

    let wire: Value = serde_json::from_str(&event.to_wire()).unwrap();
    assert_eq!(wire[0], json!("ms01"));
}

#[test]
fn test_empty_batch_and_unset_send_nothing() {
    let dir = TempDir::new().unwrap();
    let (store, rx) = open_with_channel(&dir);

    assert!(store.set_batch(Map::new()).unwrap().is_empty());
    assert!(rx.try_recv().is_err());

    store.set("x", "1").unwrap();
    rx.try_recv().unwrap();
    store.unset("x").unwrap();
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_listener_can_read_back_written_keys() {
    let dir = TempDir::new().unwrap();
    let handle: Arc<OnceLock<Weak<EnvironmentStore>>> = Arc::new(OnceLock::new());
    let seen = Arc::new(Mutex::new(Vec::new()));

    // Reading the store from inside the broadcaster only works when the write
    // lock has been released before delivery.
    let listener = {
        let handle = Arc::clone(&handle);
        let seen = Arc::clone(&seen);
        move |event: &EnvironmentEvent| -> Result<(), NotifyError> {
            if let Some(store) = handle.get().and_then(Weak::upgrade) {
                for key in event.written().keys() {
                    let value = store.get(key, Scope::global()).ok();
                    seen.lock().unwrap().push((key.clone(), value));
                }
            }
            Ok(())
        }
    };

    let store = Arc::new(
        EnvironmentStore::open(dir.path().join("env.db"))
            .unwrap()
            .with_broadcaster(listener),
    );
    handle.set(Arc::downgrade(&store)).unwrap();

    store.set("ScanID", "9").unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.as_slice(), &[("ScanID".to_string(), Some(json!(9)))]);
}

#[test]
fn test_failed_broadcast_keeps_write() {
    let dir = TempDir::new().unwrap();
    let store = EnvironmentStore::open(dir.path().join("env.db"))
        .unwrap()
        .with_broadcaster(|_: &EnvironmentEvent| -> Result<(), NotifyError> {
            Err(NotifyError::Rejected("listener offline".into()))
        });

    let err = store.set("ScanDir", "'/kept'").unwrap_err();
    assert!(err.is_persisted());
    match err {
        EnvError::Notification { written, source } => {
            assert_eq!(written.get("ScanDir"), Some(&json!("/kept")));
            assert!(matches!(source, NotifyError::Rejected(_)));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(store.get("ScanDir", Scope::global()).unwrap(), json!("/kept"));
}

#[test]
fn test_disconnected_listener_reports_notification_error() {
    let dir = TempDir::new().unwrap();
    let (store, rx) = open_with_channel(&dir);
    drop(rx);

    let err = store.set("a", "1").unwrap_err();
    assert!(matches!(
        err,
        EnvError::Notification {
            source: NotifyError::Disconnected,
            ..
        }
    ));
    assert!(store.has("a", Scope::global()));
}
