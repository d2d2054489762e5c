//! The `Worker` trait -- the adapter interface for task executors.
//!
//! Each concrete worker (code, test, docs, review, refactor) implements
//! this trait. The trait is intentionally object-safe so it can be stored
//! as `Box<dyn Worker>` in [`super::registry::WorkerRegistry`], the same
//! shape `Harness`/`HarnessRegistry` uses for agent adapters.

use agentor_types::{Capability, Event, Message, Task, TaskResult, WorkerId, WorkerStatus};
use async_trait::async_trait;
use thiserror::Error;

/// A failure from [`Worker::execute`], carrying the stable error code the
/// retry engine categorizes on.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct ExecuteError {
    pub code: agentor_types::ErrorCode,
    pub message: String,
}

impl ExecuteError {
    pub fn new(code: agentor_types::ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Adapter interface for task executors.
///
/// # Object Safety
///
/// Every method returns a concrete or boxed type, so `dyn Worker` is a
/// legal trait object.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Stable identity for this worker instance.
    fn id(&self) -> WorkerId;

    /// Static capability descriptor -- what task types and file patterns
    /// this worker can handle, and its concurrency ceiling.
    fn capabilities(&self) -> &Capability;

    /// Current coarse status.
    fn status(&self) -> WorkerStatus;

    /// Update coarse status. Called by [`super::run_task_lifecycle`] as a
    /// task moves through assignment and completion; concrete workers
    /// need only store the value behind interior mutability.
    fn set_status(&self, status: WorkerStatus);

    /// Handle an inbound message (e.g. `Assign`). Implementations that
    /// don't need custom message handling can delegate entirely to
    /// [`super::run_task_lifecycle`] and treat `enqueue` as a no-op that
    /// just records the message for observability.
    async fn enqueue(&self, message: Message) -> anyhow::Result<()>;

    /// Gracefully stop accepting new work.
    async fn shutdown(&self);

    /// Run one task to completion. Not meant to be called directly by
    /// schedulers -- use [`super::run_task_lifecycle`], which wraps this
    /// with capability validation, lease acquisition, and retry.
    async fn execute(&self, task: &Task) -> Result<TaskResult, ExecuteError>;
}

/// Optional hook for workers that want to observe lifecycle events (e.g.
/// for test assertions). Default implementation does nothing.
pub trait WorkerObserver: Send + Sync {
    fn observe(&self, _event: &Event) {}
}

const _: () = {
    fn _assert_object_safe(_: &dyn Worker) {}
};

#[cfg(test)]
mod tests {
    use super::*;
    use agentor_types::{ResultStatus, TaskMetrics, TaskType};
    use std::collections::BTreeSet;
    use std::num::NonZeroUsize;

    struct NoopWorker {
        id: WorkerId,
        capability: Capability,
        status: std::sync::Mutex<WorkerStatus>,
    }

    #[async_trait]
    impl Worker for NoopWorker {
        fn id(&self) -> WorkerId {
            self.id
        }

        fn capabilities(&self) -> &Capability {
            &self.capability
        }

        fn status(&self) -> WorkerStatus {
            *self.status.lock().unwrap()
        }

        fn set_status(&self, status: WorkerStatus) {
            *self.status.lock().unwrap() = status;
        }

        async fn enqueue(&self, _message: Message) -> anyhow::Result<()> {
            Ok(())
        }

        async fn shutdown(&self) {}

        async fn execute(&self, _task: &Task) -> Result<TaskResult, ExecuteError> {
            Ok(TaskResult {
                status: ResultStatus::Success,
                files_modified: vec![],
                files_created: vec![],
                files_deleted: vec![],
                output: None,
                errors: vec![],
                warnings: vec![],
                metrics: TaskMetrics::default(),
            })
        }
    }

    #[test]
    fn worker_is_object_safe() {
        let worker: Box<dyn Worker> = Box::new(NoopWorker {
            id: WorkerId::new(),
            capability: Capability {
                name: "noop".into(),
                file_patterns: vec!["*".into()],
                task_types: BTreeSet::from([TaskType::Code]),
                languages: vec![],
                frameworks: vec![],
                max_concurrent_tasks: NonZeroUsize::new(1).unwrap(),
            },
            status: std::sync::Mutex::new(WorkerStatus::Idle),
        });
        assert_eq!(worker.status(), WorkerStatus::Idle);
    }
}
