//! Structural validation for shapes that can be checked without access to
//! orchestrator-wide state (the DAG-acyclicity check lives in
//! `agentor_core::graph`, since it needs to see every other task).

use thiserror::Error;

use crate::message::Message;
use crate::task::TaskDraft;

/// Errors from validating a [`TaskDraft`] or [`Message`] in isolation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("task description must not be empty")]
    EmptyDescription,

    #[error("task lists the same file more than once: {0}")]
    DuplicateFile(String),

    #[error("a task cannot depend on itself")]
    SelfDependency,

    #[error("message payload must be a JSON object or null")]
    InvalidPayloadShape,
}

/// Validate a [`TaskDraft`] on its own terms (no knowledge of other tasks
/// in the system, so this cannot catch cross-task cycles).
pub fn validate_task_draft(draft: &TaskDraft) -> Result<(), ValidationError> {
    if draft.description.trim().is_empty() {
        return Err(ValidationError::EmptyDescription);
    }

    let mut seen = std::collections::HashSet::new();
    for file in &draft.files {
        if !seen.insert(file) {
            return Err(ValidationError::DuplicateFile(file.display().to_string()));
        }
    }

    Ok(())
}

/// Validate a [`Message`] envelope (§3: "Messages are validated at every
/// boundary").
pub fn validate_message(message: &Message) -> Result<(), ValidationError> {
    if message.from == message.to && message.task_id == crate::ids::TaskId::nil() {
        // A message addressed to oneself about no real task is always
        // malformed; real self-addressed status pings carry a task id.
        return Err(ValidationError::InvalidPayloadShape);
    }
    match &message.payload {
        serde_json::Value::Object(_) | serde_json::Value::Null => Ok(()),
        _ => Err(ValidationError::InvalidPayloadShape),
    }
}
