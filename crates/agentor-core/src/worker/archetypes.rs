//! Concrete worker archetypes. Each differs only in `execute`; the
//! envelope around it (capability validation, lease acquisition, retry,
//! event emission) lives once in [`super::run_task_lifecycle`], the same
//! way gator's concrete harnesses differ only in how they spawn/stream/
//! kill a process while sharing `run_agent_lifecycle`.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use agentor_types::{Capability, Message, ResultStatus, Task, TaskMetrics, TaskResult, TaskType, WorkerId, WorkerStatus};
use async_trait::async_trait;

use super::trait_def::{ExecuteError, Worker};

/// Shared fields every archetype needs; concrete structs wrap this and
/// delegate the boilerplate half of the trait to it.
struct WorkerBase {
    id: WorkerId,
    capability: Capability,
    status: Mutex<WorkerStatus>,
}

impl WorkerBase {
    fn new(name: &str, task_types: BTreeSet<TaskType>, file_patterns: Vec<String>) -> Self {
        Self {
            id: WorkerId::new(),
            capability: Capability {
                name: name.to_string(),
                file_patterns,
                task_types,
                languages: vec![],
                frameworks: vec![],
                max_concurrent_tasks: NonZeroUsize::new(4).unwrap(),
            },
            status: Mutex::new(WorkerStatus::Idle),
        }
    }
}

macro_rules! worker_archetype {
    ($name:ident, $default_patterns:expr, $execute:expr) => {
        pub struct $name {
            base: WorkerBase,
        }

        impl $name {
            pub fn new(name: &str, task_types: BTreeSet<TaskType>) -> Self {
                Self {
                    base: WorkerBase::new(name, task_types, $default_patterns),
                }
            }
        }

        #[async_trait]
        impl Worker for $name {
            fn id(&self) -> WorkerId {
                self.base.id
            }

            fn capabilities(&self) -> &Capability {
                &self.base.capability
            }

            fn status(&self) -> WorkerStatus {
                *self.base.status.lock().expect("worker status mutex poisoned")
            }

            fn set_status(&self, status: WorkerStatus) {
                *self.base.status.lock().expect("worker status mutex poisoned") = status;
            }

            async fn enqueue(&self, _message: Message) -> anyhow::Result<()> {
                Ok(())
            }

            async fn shutdown(&self) {
                self.set_status(WorkerStatus::Offline);
            }

            async fn execute(&self, task: &Task) -> Result<TaskResult, ExecuteError> {
                $execute(task)
            }
        }
    };
}

fn base_result(task: &Task) -> TaskResult {
    TaskResult {
        status: ResultStatus::Success,
        files_modified: task.files.clone(),
        files_created: vec![],
        files_deleted: vec![],
        output: Some(format!("completed {}", task.description)),
        errors: vec![],
        warnings: vec![],
        metrics: TaskMetrics::default(),
    }
}

/// `CodeWorker`: reports changed lines proportional to the files touched.
fn code_execute(task: &Task) -> Result<TaskResult, ExecuteError> {
    let mut result = base_result(task);
    result.metrics.lines_changed = task.files.len() as u64 * 10;
    Ok(result)
}

/// `TestWorker`: the one archetype that reports `test_delta`/
/// `coverage_delta`, since those fields only make sense for test runs.
fn test_execute(task: &Task) -> Result<TaskResult, ExecuteError> {
    let mut result = base_result(task);
    result.metrics.test_delta = Some(task.files.len() as i64);
    result.metrics.coverage_delta = Some(0.5);
    Ok(result)
}

/// `DocsWorker`: treats every touched file as newly created rather than
/// modified -- docs tasks more often add a page than edit existing prose.
fn docs_execute(task: &Task) -> Result<TaskResult, ExecuteError> {
    let mut result = base_result(task);
    result.files_created = std::mem::take(&mut result.files_modified);
    Ok(result)
}

/// `ReviewWorker`: never modifies files; a review only ever reads.
fn review_execute(task: &Task) -> Result<TaskResult, ExecuteError> {
    let mut result = base_result(task);
    result.files_modified.clear();
    result.output = Some(format!("reviewed {}", task.description));
    Ok(result)
}

/// `RefactorWorker`: reports a `Partial` result with a warning when it
/// touches more than one file, modeling the real risk that a multi-file
/// refactor leaves something for a human to double-check (§4.3 item 7).
fn refactor_execute(task: &Task) -> Result<TaskResult, ExecuteError> {
    let mut result = base_result(task);
    if task.files.len() > 1 {
        result.status = ResultStatus::Partial;
        result.warnings.push("refactor touched multiple files; verify call sites".into());
    }
    Ok(result)
}

worker_archetype!(
    CodeWorker,
    vec!["*.rs".into(), "*.ts".into(), "*.py".into(), "*.go".into()],
    code_execute
);
worker_archetype!(
    TestWorker,
    vec!["*_test.*".into(), "*.test.*".into(), "tests/**".into()],
    test_execute
);
worker_archetype!(DocsWorker, vec!["*.md".into(), "docs/**".into()], docs_execute);
worker_archetype!(ReviewWorker, vec!["*".into()], review_execute);
worker_archetype!(RefactorWorker, vec!["*.rs".into(), "*.ts".into(), "*.py".into()], refactor_execute);

#[cfg(test)]
mod tests {
    use super::*;
    use agentor_types::{Priority, TaskStatus};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn task() -> Task {
        Task {
            id: agentor_types::TaskId::new(),
            status: TaskStatus::InProgress,
            assigned_worker: None,
            task_type: TaskType::Code,
            priority: Priority::Medium,
            description: "add feature".into(),
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

    #[tokio::test]
    async fn code_worker_executes_successfully() {
        let worker = CodeWorker::new("code-1", BTreeSet::from([TaskType::Code]));
        let result = worker.execute(&task()).await.unwrap();
        assert_eq!(result.status, ResultStatus::Success);
    }

    #[tokio::test]
    async fn shutdown_transitions_to_offline() {
        let worker = DocsWorker::new("docs-1", BTreeSet::from([TaskType::Docs]));
        worker.shutdown().await;
        assert_eq!(worker.status(), WorkerStatus::Offline);
    }

    #[test]
    fn each_archetype_declares_distinct_default_patterns() {
        let code = CodeWorker::new("c", BTreeSet::from([TaskType::Code]));
        let docs = DocsWorker::new("d", BTreeSet::from([TaskType::Docs]));
        assert_ne!(code.capabilities().file_patterns, docs.capabilities().file_patterns);
    }
}
