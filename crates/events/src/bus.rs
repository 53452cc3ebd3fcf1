//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` in the API state. Publishing
//! never blocks the request that produced the event.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use glasslead_core::types::Timestamp;

/// Published once a lead has been persisted.
pub const LEAD_SUBMITTED: &str = "lead.submitted";

// ---------------------------------------------------------------------------
// FunnelEvent
// ---------------------------------------------------------------------------

/// A domain event raised by the funnel backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelEvent {
    /// Dot-separated event name, e.g. `"lead.submitted"`.
    pub event_type: String,

    /// Source entity kind (e.g. `"lead"`).
    pub source_entity_type: Option<String>,

    pub source_entity_id: Option<String>,

    /// Event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: Timestamp,
}

impl FunnelEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_source(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// When the buffer is full the oldest undelivered events are dropped and
/// slow receivers observe `RecvError::Lagged`.
pub struct EventBus {
    sender: broadcast::Sender<FunnelEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. With no subscribers the event is
    /// dropped.
    pub fn publish(&self, event: FunnelEvent) {
        // SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FunnelEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
