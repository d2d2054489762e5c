//! The message envelope exchanged between the scheduler and workers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{TaskId, WorkerId};
use crate::task::Priority;

/// The kind of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Assign,
    Complete,
    Conflict,
    Status,
    Error,
    Help,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Assign => "assign",
            Self::Complete => "complete",
            Self::Conflict => "conflict",
            Self::Status => "status",
            Self::Error => "error",
            Self::Help => "help",
        };
        f.write_str(s)
    }
}

/// A message passed between the scheduler and a worker (or vice versa).
///
/// `from`/`to` name a [`WorkerId`]; the scheduler itself is addressed by
/// [`WorkerId::nil`] since it is not a registered worker.
///
/// Every field is validated at construction time by
/// [`crate::validate::validate_message`] rather than by the type itself,
/// so messages can be freely constructed in tests without going through
/// a fallible constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub from: WorkerId,
    pub to: WorkerId,
    pub task_id: TaskId,
    pub message_type: MessageType,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub priority: Priority,
}
