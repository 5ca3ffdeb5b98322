//! Client event types, envelope, and event bus for UI notifications.
//!
//! The session manager and the note store publish into one broadcast
//! channel. Front ends subscribe to know when to recompute views; they never
//! need to poll the store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::models::SessionState;

/// Domain event published by the client layer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// The session moved to a new state.
    SessionChanged {
        state: SessionState,
        #[serde(skip_serializing_if = "Option::is_none")]
        username: Option<String>,
    },
    /// The note collection changed visibly.
    NotesChanged { revision: u64, count: usize },
    /// A store or session operation failed and was surfaced to the caller.
    OperationFailed {
        op: &'static str,
        #[serde(serialize_with = "serialize_kind")]
        kind: ErrorKind,
    },
}

fn serialize_kind<S: serde::Serializer>(kind: &ErrorKind, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&kind.to_string())
}

impl ClientEvent {
    /// Namespaced event type (e.g., `"notes.changed"`).
    pub fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::SessionChanged { .. } => "session.changed",
            ClientEvent::NotesChanged { .. } => "notes.changed",
            ClientEvent::OperationFailed { .. } => "operation.failed",
        }
    }
}

/// Envelope carrying an event id and timestamp around a [`ClientEvent`].
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// UUIDv7, so ids sort by emission time.
    pub event_id: Uuid,
    pub event_type: &'static str,
    pub occurred_at: DateTime<Utc>,
    pub payload: ClientEvent,
}

impl EventEnvelope {
    pub fn new(event: ClientEvent) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event.event_type(),
            occurred_at: Utc::now(),
            payload: event,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast-based event bus shared by the session manager and the store.
///
/// Cloning is cheap; all clones publish into the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped if nobody is listening.
    pub fn emit(&self, event: ClientEvent) {
        let envelope = EventEnvelope::new(event);
        tracing::trace!(
            event_type = envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to receive events. Each subscriber gets its own stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}
