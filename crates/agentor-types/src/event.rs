//! Lifecycle events published on the event bus (§4.7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of a lifecycle [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    TaskCreated,
    TaskAssigned,
    TaskCompleted,
    ConflictDetected,
    WorkerStatusChanged,
    LockExpired,
    /// Synthetic marker inserted in place of events a slow subscriber
    /// could not keep up with.
    EventsDropped,
}

/// A single lifecycle event, monotonically sequenced by the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub seq: u64,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}
