//! Change notification
//!
//! After a batch of keys is written the store hands one event to the host's
//! broadcaster. Delivery happens outside the store lock; a failed delivery
//! never undoes the write.

use crate::error::NotifyError;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::sync::mpsc::{channel, Receiver, Sender};

/// Reserved payload field identifying the event kind.
pub const EVENT_TYPE_FIELD: &str = "__type__";

/// Event kind for newly written environment values.
pub const NEW_ENVIRONMENT: &str = "new";

/// A change event: routing tag plus the written keys and the type marker.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentEvent {
    pub tag: String,
    pub payload: Map<String, Value>,
    pub ts: String,
}

impl EnvironmentEvent {
    /// Event for a batch of freshly written keys.
    pub fn new_environment(tag: impl Into<String>, written: &Map<String, Value>) -> Self {
        let mut payload = written.clone();
        payload.insert(
            EVENT_TYPE_FIELD.to_string(),
            Value::String(NEW_ENVIRONMENT.to_string()),
        );
        Self {
            tag: tag.into(),
            payload,
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Written keys without the type marker.
    pub fn written(&self) -> Map<String, Value> {
        self.payload
            .iter()
            .filter(|(k, _)| k.as_str() != EVENT_TYPE_FIELD)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Two-element `[tag, payload]` sequence as JSON text.
    pub fn to_wire(&self) -> String {
        Value::Array(vec![
            Value::String(self.tag.clone()),
            Value::Object(self.payload.clone()),
        ])
        .to_string()
    }
}

/// Host-supplied delivery of change events to listeners
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, event: &EnvironmentEvent) -> Result<(), NotifyError>;
}

impl<F> Broadcaster for F
where
    F: Fn(&EnvironmentEvent) -> Result<(), NotifyError> + Send + Sync,
{
    fn broadcast(&self, event: &EnvironmentEvent) -> Result<(), NotifyError> {
        self(event)
    }
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBroadcaster;

impl Broadcaster for NullBroadcaster {
    fn broadcast(&self, _event: &EnvironmentEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// In-process bus: events are queued for a single receiver held by the host.
#[derive(Clone)]
pub struct ChannelBroadcaster {
    sender: Sender<EnvironmentEvent>,
}

impl ChannelBroadcaster {
    pub fn new_pair() -> (Self, Receiver<EnvironmentEvent>) {
        let (sender, receiver) = channel();
        (Self { sender }, receiver)
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn broadcast(&self, event: &EnvironmentEvent) -> Result<(), NotifyError> {
        self.sender
            .send(event.clone())
            .map_err(|_| NotifyError::Disconnected)
    }
}
