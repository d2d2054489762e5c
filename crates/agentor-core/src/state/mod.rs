//! In-memory task store and state machine.
//!
//! `gator-db`'s PostgreSQL-backed `Task` table becomes a plain
//! `HashMap<TaskId, Task>` behind an `RwLock` here, since persistence
//! across restarts is an explicit non-goal. The transition rules
//! themselves are ported from `state::TaskStateMachine`, collapsed from
//! gator's 7-state `pending -> assigned -> running -> checking ->
//! passed/failed -> escalated` chain onto this spec's 5-state model
//! (`Pending, InProgress, Completed, Failed, Blocked`), and the SQL
//! `rows == 0` optimistic-lock check becomes a compare-and-swap against
//! the in-memory record.

use std::collections::HashMap;

use agentor_types::{Task, TaskId, TaskStatus};
use chrono::Utc;
use thiserror::Error;

/// Errors transitioning a task's status.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid state transition: {from} -> {to} for task {task_id}")]
    InvalidTransition {
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("optimistic lock failed: task {task_id} has status {actual}, expected {expected}")]
    OptimisticLockFailed {
        task_id: TaskId,
        expected: TaskStatus,
        actual: TaskStatus,
    },

    #[error("task {0} not found")]
    NotFound(TaskId),
}

/// Validates and executes task status transitions.
pub struct TaskStateMachine;

impl TaskStateMachine {
    /// Whether `from -> to` is a legal edge in the 5-state graph (§4.6).
    pub fn is_valid_transition(from: TaskStatus, to: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (from, to),
            (Pending, InProgress)
                | (InProgress, Completed)
                | (InProgress, InProgress) // retryable failure re-enters in_progress
                | (InProgress, Failed)
                | (Pending, Failed) // cancel from pending
                | (Blocked, Failed) // cancel from blocked
                | (Pending, Blocked) // dependency failed + cascade
        )
    }
}

/// The orchestrator's in-memory task table.
#[derive(Default)]
pub struct TaskStore {
    tasks: HashMap<TaskId, Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, task: Task) {
        self.tasks.insert(task.id, task);
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn all(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Execute a state transition with an optimistic check against the
    /// stored status, exactly mirroring `TaskStateMachine::transition`'s
    /// contract but against a `HashMap` entry instead of a SQL row count.
    pub fn transition(
        &mut self,
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<(), TransitionError> {
        if !TaskStateMachine::is_valid_transition(from, to) {
            return Err(TransitionError::InvalidTransition { task_id, from, to });
        }

        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or(TransitionError::NotFound(task_id))?;

        if task.status != from {
            return Err(TransitionError::OptimisticLockFailed {
                task_id,
                expected: from,
                actual: task.status,
            });
        }

        task.status = to;
        task.updated_at = Utc::now();
        Ok(())
    }

    pub fn remove(&mut self, task_id: TaskId) -> Option<Task> {
        self.tasks.remove(&task_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentor_types::{Priority, TaskType};
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::PathBuf;

    fn task(status: TaskStatus) -> Task {
        Task {
            id: TaskId::new(),
            status,
            assigned_worker: None,
            task_type: TaskType::Code,
            priority: Priority::Medium,
            description: "x".into(),
            dependencies: BTreeSet::new(),
            files: vec![PathBuf::from("a.rs")],
            context: BTreeMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            estimated_duration: None,
            metadata: None,
            attempt: 0,
        }
    }

    #[test]
    fn valid_transitions_are_accepted() {
        assert!(TaskStateMachine::is_valid_transition(TaskStatus::Pending, TaskStatus::InProgress));
        assert!(TaskStateMachine::is_valid_transition(TaskStatus::InProgress, TaskStatus::Completed));
        assert!(TaskStateMachine::is_valid_transition(TaskStatus::Pending, TaskStatus::Blocked));
    }

    #[test]
    fn completed_to_anything_is_invalid() {
        assert!(!TaskStateMachine::is_valid_transition(TaskStatus::Completed, TaskStatus::InProgress));
        assert!(!TaskStateMachine::is_valid_transition(TaskStatus::Completed, TaskStatus::Failed));
    }

    #[test]
    fn store_transition_updates_status_and_timestamp() {
        let mut store = TaskStore::new();
        let t = task(TaskStatus::Pending);
        let id = t.id;
        let before = t.updated_at;
        store.insert(t);

        store.transition(id, TaskStatus::Pending, TaskStatus::InProgress).unwrap();
        let updated = store.get(id).unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert!(updated.updated_at >= before);
    }

    #[test]
    fn optimistic_lock_rejects_stale_from() {
        let mut store = TaskStore::new();
        let t = task(TaskStatus::InProgress);
        let id = t.id;
        store.insert(t);

        let err = store.transition(id, TaskStatus::Pending, TaskStatus::InProgress).unwrap_err();
        assert!(matches!(err, TransitionError::OptimisticLockFailed { .. }));
    }

    #[test]
    fn transition_on_missing_task_fails() {
        let mut store = TaskStore::new();
        let err = store
            .transition(TaskId::new(), TaskStatus::Pending, TaskStatus::InProgress)
            .unwrap_err();
        assert!(matches!(err, TransitionError::NotFound(_)));
    }
}
