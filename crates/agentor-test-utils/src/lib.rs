//! Shared test fixtures for orchestrator integration tests.
//!
//! Where `gator-test-utils` spins up a shared PostgreSQL container because
//! gator's state lives in a database, this crate has nothing external to
//! stand up: the orchestrator's state is in-memory, so fixtures here are
//! plain in-process workers and draft builders.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Mutex;

use agentor_types::{
    Capability, ErrorCode, Message, Priority, ResultStatus, Task, TaskDraft, TaskMetrics,
    TaskResult, TaskType, WorkerId, WorkerStatus,
};
use agentor_core::worker::{ExecuteError, Worker};
use async_trait::async_trait;

/// One scripted outcome for [`ScriptedWorker::execute`].
pub enum Script {
    Succeed,
    Fail(ErrorCode),
}

/// A worker whose `execute` follows a fixed, pre-recorded script instead
/// of doing real work. Each call to `execute` consumes the next scripted
/// outcome; once the script is exhausted, it keeps succeeding.
///
/// Used in place of `CodeWorker`/`TestWorker`/etc. in tests that need
/// deterministic retry or failure behavior (S4, S5) or that need to
/// observe how many times `execute` was actually invoked.
pub struct ScriptedWorker {
    id: WorkerId,
    capability: Capability,
    status: Mutex<WorkerStatus>,
    script: Mutex<VecDeque<Script>>,
    invocations: std::sync::Arc<std::sync::atomic::AtomicU32>,
}

impl ScriptedWorker {
    pub fn new(name: &str, task_types: BTreeSet<TaskType>, script: Vec<Script>) -> Self {
        Self::with_counter(name, task_types, script).0
    }

    /// Build a worker alongside a handle that keeps reading its
    /// invocation count after the worker itself has been moved into a
    /// [`agentor_core::WorkerRegistry`].
    pub fn with_counter(
        name: &str,
        task_types: BTreeSet<TaskType>,
        script: Vec<Script>,
    ) -> (Self, std::sync::Arc<std::sync::atomic::AtomicU32>) {
        let invocations = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let worker = Self {
            id: WorkerId::new(),
            capability: Capability {
                name: name.to_string(),
                file_patterns: vec!["*".into()],
                task_types,
                languages: vec![],
                frameworks: vec![],
                max_concurrent_tasks: NonZeroUsize::new(4).unwrap(),
            },
            status: Mutex::new(WorkerStatus::Idle),
            script: Mutex::new(script.into_iter().collect()),
            invocations: invocations.clone(),
        };
        (worker, invocations)
    }
}

#[async_trait]
impl Worker for ScriptedWorker {
    fn id(&self) -> WorkerId {
        self.id
    }

    fn capabilities(&self) -> &Capability {
        &self.capability
    }

    fn status(&self) -> WorkerStatus {
        *self.status.lock().expect("status mutex poisoned")
    }

    fn set_status(&self, status: WorkerStatus) {
        *self.status.lock().expect("status mutex poisoned") = status;
    }

    async fn enqueue(&self, _message: Message) -> anyhow::Result<()> {
        Ok(())
    }

    async fn shutdown(&self) {
        self.set_status(WorkerStatus::Offline);
    }

    async fn execute(&self, _task: &Task) -> Result<TaskResult, ExecuteError> {
        self.invocations.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let next = self.script.lock().expect("script queue poisoned").pop_front();
        match next {
            None | Some(Script::Succeed) => Ok(TaskResult {
                status: ResultStatus::Success,
                files_modified: vec![],
                files_created: vec![],
                files_deleted: vec![],
                output: None,
                errors: vec![],
                warnings: vec![],
                metrics: TaskMetrics::default(),
            }),
            Some(Script::Fail(code)) => Err(ExecuteError::new(code, format!("scripted failure: {code}"))),
        }
    }
}

/// A sticky release signal: once [`Gate::open`] is called, every past and
/// future waiter on [`Gate::wait`] proceeds immediately. Plain
/// `tokio::sync::Notify::notify_waiters` only wakes waiters registered at
/// the moment it's called, which races against a [`BlockingWorker`] that
/// hasn't started `execute` yet.
#[derive(Default)]
pub struct Gate {
    opened: std::sync::atomic::AtomicBool,
    notify: tokio::sync::Notify,
}

impl Gate {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::default())
    }

    pub fn open(&self) {
        self.opened.store(true, std::sync::atomic::Ordering::Release);
        self.notify.notify_waiters();
    }

    pub async fn wait(&self) {
        while !self.opened.load(std::sync::atomic::Ordering::Acquire) {
            self.notify.notified().await;
        }
    }
}

/// A worker whose `execute` blocks until its [`Gate`] is opened, for
/// exercising file-conflict queuing (S3) and mid-flight cancellation (S6).
pub struct BlockingWorker {
    id: WorkerId,
    capability: Capability,
    status: Mutex<WorkerStatus>,
    gate: std::sync::Arc<Gate>,
}

impl BlockingWorker {
    pub fn new(name: &str, task_types: BTreeSet<TaskType>) -> Self {
        Self::with_shared_gate(name, task_types, Gate::new())
    }

    /// Build a worker whose release signal is shared with other workers,
    /// so opening one [`Gate`] releases whichever of them ended up
    /// holding the in-flight task.
    pub fn with_shared_gate(name: &str, task_types: BTreeSet<TaskType>, gate: std::sync::Arc<Gate>) -> Self {
        Self {
            id: WorkerId::new(),
            capability: Capability {
                name: name.to_string(),
                file_patterns: vec!["*".into()],
                task_types,
                languages: vec![],
                frameworks: vec![],
                max_concurrent_tasks: NonZeroUsize::new(4).unwrap(),
            },
            status: Mutex::new(WorkerStatus::Idle),
            gate,
        }
    }

    /// Release any task currently or later blocked in `execute`.
    pub fn release(&self) {
        self.gate.open();
    }
}

#[async_trait]
impl Worker for BlockingWorker {
    fn id(&self) -> WorkerId {
        self.id
    }

    fn capabilities(&self) -> &Capability {
        &self.capability
    }

    fn status(&self) -> WorkerStatus {
        *self.status.lock().expect("status mutex poisoned")
    }

    fn set_status(&self, status: WorkerStatus) {
        *self.status.lock().expect("status mutex poisoned") = status;
    }

    async fn enqueue(&self, _message: Message) -> anyhow::Result<()> {
        Ok(())
    }

    async fn shutdown(&self) {
        self.set_status(WorkerStatus::Offline);
    }

    async fn execute(&self, _task: &Task) -> Result<TaskResult, ExecuteError> {
        // Resolves only once the gate opens, or the lifecycle's
        // `CancellationToken` fires the outer `select!` this races under.
        self.gate.wait().await;
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

/// Build a minimal valid [`TaskDraft`] for `files`, with no dependencies.
pub fn draft(files: Vec<&str>) -> TaskDraft {
    TaskDraft {
        task_type: TaskType::Code,
        priority: Priority::Medium,
        description: "test task".into(),
        dependencies: BTreeSet::new(),
        files: files.into_iter().map(PathBuf::from).collect(),
        context: BTreeMap::new(),
        estimated_duration: None,
        metadata: None,
    }
}

/// Same as [`draft`] but with an explicit priority, for ordering tests.
pub fn draft_with_priority(files: Vec<&str>, priority: Priority) -> TaskDraft {
    TaskDraft { priority, ..draft(files) }
}
