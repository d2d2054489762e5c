//! Scheduler / Orchestrator: accepts tasks, selects workers, dispatches,
//! collects results, emits events (§4.6).
//!
//! The dispatch loop is ported from `orchestrator::run_orchestrator`: a
//! single `tokio::select!` loop racing task-completion notifications
//! against a submission `Notify` and a periodic lease-sweep tick, bounded
//! by a `Semaphore` sized to `max_concurrent_tasks`. Where gator hands a
//! finished `LifecycleDone` back over an mpsc channel to decide the next
//! harness fallback, this loop hands a `DispatchDone` back to update task
//! state, the dependency graph, and worker performance counters.
//!
//! Every scheduler-internal map lives behind a `tokio::sync::RwLock`
//! (dispatch cost is dwarfed by task execution, the same rationale the
//! teacher's `WorktreeManager` gives for serializing git operations behind
//! one mutex); the Lock Manager keeps its own `std::sync::Mutex` since it
//! never needs to hold a lock across an `.await`.

pub mod config;

pub use config::OrchestratorConfig;

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentor_types::{
    Event, EventType, PerformanceCounters, ResultStatus, Task, TaskDraft, TaskId, TaskStatus,
    ValidationError, WorkerId, WorkerState, WorkerStatus,
};
use chrono::Utc;
use thiserror::Error;
use tokio::sync::{mpsc, Notify, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::conflict::{self, Candidate, Conflict, ConflictStrategy};
use crate::events::{EventBus, EventSubscription};
use crate::graph::{DependencyGraph, GraphError};
use crate::lock::LockManager;
use crate::retry::RetryCounters;
use crate::state::{TaskStore, TransitionError};
use crate::worker::{run_task_lifecycle, LifecycleOutcome, Worker, WorkerRegistry};

/// Errors from [`Orchestrator::submit`] / [`Orchestrator::submit_with_dependencies`].
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("task queue is full")]
    QueueFull,

    #[error("submission aborted: {0} conflict(s) with existing tasks", .0.len())]
    ConflictAborted(Vec<Conflict>),
}

/// Errors from [`Orchestrator::cancel`].
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("task {0} has already reached a terminal state")]
    AlreadyTerminal(TaskId),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("orchestrator did not finish shutting down within the deadline")]
    ShutdownTimedOut,

    #[error("dispatch loop panicked: {0}")]
    DispatchLoopPanicked(String),
}

struct DispatchDone {
    task_id: TaskId,
    worker_id: WorkerId,
    outcome: LifecycleOutcome,
}

struct Shared {
    registry: WorkerRegistry,
    task_store: RwLock<TaskStore>,
    graph: RwLock<DependencyGraph>,
    worker_states: RwLock<HashMap<WorkerId, WorkerState>>,
    lock_manager: LockManager,
    retry_counters: RetryCounters,
    event_bus: EventBus,
    cancel_tokens: RwLock<HashMap<TaskId, CancellationToken>>,
    config: OrchestratorConfig,
    notify: Notify,
    semaphore: Arc<Semaphore>,
    completion_tx: mpsc::Sender<DispatchDone>,
    shutdown: CancellationToken,
}

/// The task orchestrator. Cheap to clone (an `Arc` internally); share one
/// instance across every submitter and observer in a process.
pub struct Orchestrator {
    shared: Arc<Shared>,
    dispatch_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    /// Build an orchestrator over `registry` and start its dispatch loop.
    pub fn new(registry: WorkerRegistry, config: OrchestratorConfig) -> Arc<Self> {
        let worker_states = registry
            .iter()
            .map(|w| (w.id(), initial_worker_state(w)))
            .collect();

        let (completion_tx, completion_rx) = mpsc::channel(config.max_concurrent_tasks.get() * 4);
        let max_concurrent = config.max_concurrent_tasks.get();

        let shared = Arc::new(Shared {
            registry,
            task_store: RwLock::new(TaskStore::new()),
            graph: RwLock::new(DependencyGraph::new()),
            worker_states: RwLock::new(worker_states),
            lock_manager: LockManager::new(),
            retry_counters: RetryCounters::new(),
            event_bus: EventBus::default(),
            cancel_tokens: RwLock::new(HashMap::new()),
            config,
            notify: Notify::new(),
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            completion_tx,
            shutdown: CancellationToken::new(),
        });

        let handle = tokio::spawn(dispatch_loop(Arc::clone(&shared), completion_rx));

        Arc::new(Self {
            shared,
            dispatch_handle: Mutex::new(Some(handle)),
        })
    }

    /// Submit a new task with no explicit cross-task dependencies.
    pub async fn submit(&self, draft: TaskDraft) -> Result<TaskId, SubmitError> {
        self.submit_with_dependencies(draft, BTreeSet::new()).await
    }

    /// Submit a new task, merging `extra_deps` into whatever the draft
    /// already lists (§4.6: `submit_with_dependencies`).
    pub async fn submit_with_dependencies(
        &self,
        mut draft: TaskDraft,
        extra_deps: BTreeSet<TaskId>,
    ) -> Result<TaskId, SubmitError> {
        draft.dependencies.extend(extra_deps);
        agentor_types::validate_task_draft(&draft)?;

        let id = TaskId::new();
        let mut store = self.shared.task_store.write().await;

        if store.len() >= self.shared.config.task_queue_size.get() {
            return Err(SubmitError::QueueFull);
        }

        if self.shared.config.conflict_strategy == ConflictStrategy::Abort {
            let others: Vec<(TaskId, Vec<PathBuf>)> = store
                .all()
                .filter(|t| !t.is_terminal())
                .map(|t| (t.id, t.files.clone()))
                .collect();
            let candidates: Vec<Candidate> = others
                .iter()
                .map(|(oid, files)| Candidate { task_id: *oid, files })
                .collect();
            let this = Candidate { task_id: id, files: &draft.files };
            let deps = draft.dependencies.clone();
            let conflicts = conflict::detect(&this, &candidates, move |a, b| a == id && deps.contains(&b));
            if !conflicts.is_empty() {
                return Err(SubmitError::ConflictAborted(conflicts));
            }
        }

        self.shared.graph.write().await.add(id, draft.dependencies.clone())?;

        let task = Task::from_draft(id, draft, Utc::now());
        store.insert(task);
        drop(store);

        self.shared
            .event_bus
            .publish(EventType::TaskCreated, serde_json::json!({ "task_id": id.to_string() }));
        self.shared.notify.notify_waiters();
        Ok(id)
    }

    /// Cancel a task. Pending/blocked tasks fail immediately; in-progress
    /// tasks are signalled cooperatively and fail once their current
    /// `execute`/backoff sleep observes the cancellation.
    pub async fn cancel(&self, task_id: TaskId) -> Result<(), OrchestratorError> {
        let status = {
            let store = self.shared.task_store.read().await;
            store
                .get(task_id)
                .map(|t| t.status)
                .ok_or(OrchestratorError::TaskNotFound(task_id))?
        };

        match status {
            TaskStatus::Pending => {
                self.shared
                    .task_store
                    .write()
                    .await
                    .transition(task_id, TaskStatus::Pending, TaskStatus::Failed)?;
                let blocked = self
                    .shared
                    .graph
                    .write()
                    .await
                    .mark_failed(task_id, self.shared.config.cascade_on_failure);
                apply_cascade_blocked(&self.shared, blocked).await;
                Ok(())
            }
            TaskStatus::Blocked => {
                self.shared
                    .task_store
                    .write()
                    .await
                    .transition(task_id, TaskStatus::Blocked, TaskStatus::Failed)?;
                Ok(())
            }
            TaskStatus::InProgress => {
                if let Some(token) = self.shared.cancel_tokens.read().await.get(&task_id) {
                    token.cancel();
                }
                Ok(())
            }
            TaskStatus::Completed | TaskStatus::Failed => Err(OrchestratorError::AlreadyTerminal(task_id)),
        }
    }

    pub async fn status(&self, task_id: TaskId) -> Option<TaskStatus> {
        self.shared.task_store.read().await.get(task_id).map(|t| t.status)
    }

    pub async fn all_tasks(&self) -> Vec<Task> {
        self.shared.task_store.read().await.all().cloned().collect()
    }

    pub async fn worker_statuses(&self) -> Vec<WorkerState> {
        self.shared.worker_states.read().await.values().cloned().collect()
    }

    /// Retained events with `seq > since`, oldest first.
    pub fn events(&self, since: u64) -> Vec<Event> {
        self.shared.event_bus.events_since(since)
    }

    /// Subscribe to the live event stream.
    pub fn subscribe(&self) -> EventSubscription {
        self.shared.event_bus.subscribe(crate::events::DEFAULT_SUBSCRIBER_CAPACITY)
    }

    /// Stop accepting new dispatches and wait for in-flight tasks to drain,
    /// up to `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), OrchestratorError> {
        self.shared.shutdown.cancel();
        self.shared.notify.notify_waiters();

        let handle = self
            .dispatch_handle
            .lock()
            .expect("dispatch handle mutex poisoned")
            .take();
        let Some(handle) = handle else {
            return Ok(());
        };

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(join_err)) => Err(OrchestratorError::DispatchLoopPanicked(join_err.to_string())),
            Err(_) => Err(OrchestratorError::ShutdownTimedOut),
        }
    }
}

fn initial_worker_state(worker: &dyn Worker) -> WorkerState {
    WorkerState {
        id: worker.id(),
        name: worker.capabilities().name.clone(),
        status: worker.status(),
        current_tasks: Vec::new(),
        held_locks: Vec::new(),
        capability: worker.capabilities().clone(),
        performance: PerformanceCounters::default(),
    }
}

async fn dispatch_loop(shared: Arc<Shared>, mut completion_rx: mpsc::Receiver<DispatchDone>) {
    let mut in_flight: HashMap<TaskId, WorkerId> = HashMap::new();
    let mut sweep_tick = tokio::time::interval(shared.config.sweep_interval);
    let mut shutting_down = false;

    loop {
        if shutting_down && in_flight.is_empty() {
            break;
        }

        tokio::select! {
            biased;

            _ = shared.shutdown.cancelled(), if !shutting_down => {
                shutting_down = true;
                tracing::info!(in_flight = in_flight.len(), "orchestrator shutting down, draining in-flight tasks");
                continue;
            }
            Some(done) = completion_rx.recv() => {
                in_flight.remove(&done.task_id);
                handle_completion(&shared, done).await;
            }
            _ = shared.notify.notified() => {}
            _ = sweep_tick.tick() => {
                sweep_expired_leases(&shared).await;
            }
        }

        if !shutting_down {
            dispatch_ready(&shared, &mut in_flight).await;
        }
    }

    shared.event_bus.close_all();
}

async fn dispatch_ready(shared: &Arc<Shared>, in_flight: &mut HashMap<TaskId, WorkerId>) {
    let ready_ids = shared.graph.read().await.ready();
    if ready_ids.is_empty() {
        return;
    }

    let mut ready_tasks: Vec<Task> = {
        let store = shared.task_store.read().await;
        ready_ids
            .iter()
            .filter_map(|id| store.get(*id))
            .filter(|t| t.status == TaskStatus::Pending)
            .cloned()
            .collect()
    };
    // Highest priority first, then oldest first within the same priority.
    ready_tasks.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));

    for task in ready_tasks {
        let permit = match Arc::clone(&shared.semaphore).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => break, // at max_concurrent_tasks; try again next tick
        };

        let in_flight_files: Vec<(TaskId, Vec<PathBuf>)> = {
            let store = shared.task_store.read().await;
            in_flight
                .keys()
                .filter_map(|id| store.get(*id).map(|t| (*id, t.files.clone())))
                .collect()
        };
        let candidates: Vec<Candidate> = in_flight_files
            .iter()
            .map(|(id, files)| Candidate { task_id: *id, files })
            .collect();
        let this = Candidate { task_id: task.id, files: &task.files };

        // `conflict::detect`'s `depends_on` callback is synchronous, so
        // snapshot the dependency sets we need up front rather than
        // reaching back into the (async) graph lock from inside it.
        let dep_snapshot: HashMap<TaskId, BTreeSet<TaskId>> = {
            let graph = shared.graph.read().await;
            std::iter::once(task.id)
                .chain(in_flight.keys().copied())
                .filter_map(|id| graph.dependencies_of(id).map(|deps| (id, deps.clone())))
                .collect()
        };
        let conflicts = conflict::detect(&this, &candidates, |a, b| {
            dep_snapshot.get(&a).map(|deps| deps.contains(&b)).unwrap_or(false)
        });

        if !conflicts.is_empty() {
            match shared.config.conflict_strategy {
                ConflictStrategy::Queue | ConflictStrategy::Merge => {
                    shared.event_bus.publish(
                        EventType::ConflictDetected,
                        serde_json::json!({ "task_id": task.id.to_string(), "conflicts": conflicts.len() }),
                    );
                    drop(permit);
                    continue;
                }
                ConflictStrategy::Abort => {
                    fail_task_as_aborted(shared, &task, &conflicts).await;
                    drop(permit);
                    continue;
                }
            }
        }

        let selected = {
            let states = shared.worker_states.read().await;
            shared
                .registry
                .iter()
                .filter(|w| w.capabilities().can_handle(task.task_type, &task.files))
                .filter(|w| states.get(&w.id()).map(WorkerState::has_capacity).unwrap_or(false))
                .min_by(|a, b| {
                    let sa = &states[&a.id()];
                    let sb = &states[&b.id()];
                    sa.in_flight().cmp(&sb.in_flight()).then(
                        sa.performance
                            .average_duration_ms
                            .partial_cmp(&sb.performance.average_duration_ms)
                            .unwrap_or(std::cmp::Ordering::Equal),
                    )
                })
                .map(|w| (w.capabilities().name.clone(), w.id()))
        };

        let Some((worker_name, worker_id)) = selected else {
            // No capable worker with spare capacity right now; leave pending.
            drop(permit);
            continue;
        };

        in_flight.insert(task.id, worker_id);
        {
            let mut states = shared.worker_states.write().await;
            if let Some(state) = states.get_mut(&worker_id) {
                state.current_tasks.push(task.id);
                state.status = WorkerStatus::Busy;
            }
        }
        {
            let mut store = shared.task_store.write().await;
            if let Err(err) = store.transition(task.id, TaskStatus::Pending, TaskStatus::InProgress) {
                tracing::warn!(task_id = %task.id, %err, "failed to mark task in_progress before dispatch");
            }
        }

        let cancel = CancellationToken::new();
        shared.cancel_tokens.write().await.insert(task.id, cancel.clone());

        shared.event_bus.publish(
            EventType::TaskAssigned,
            serde_json::json!({ "task_id": task.id.to_string(), "worker_id": worker_id.to_string() }),
        );
        shared.event_bus.publish(
            EventType::WorkerStatusChanged,
            serde_json::json!({ "worker_id": worker_id.to_string(), "status": "busy" }),
        );

        let shared_for_task = Arc::clone(shared);
        let completion_tx = shared.completion_tx.clone();
        let task_for_spawn = task.clone();

        tokio::spawn(async move {
            let _permit = permit;
            let Some(worker) = shared_for_task.registry.get(&worker_name) else {
                tracing::error!(worker_name, "selected worker vanished from registry before execution");
                return;
            };
            let outcome = run_task_lifecycle(
                worker,
                worker_id,
                &task_for_spawn,
                &shared_for_task.lock_manager,
                shared_for_task.config.lease_duration,
                &shared_for_task.config.retry_config,
                &shared_for_task.retry_counters,
                cancel,
            )
            .await;
            let _ = completion_tx
                .send(DispatchDone { task_id: task_for_spawn.id, worker_id, outcome })
                .await;
        });
    }
}

async fn handle_completion(shared: &Arc<Shared>, done: DispatchDone) {
    let DispatchDone { task_id, worker_id, outcome } = done;
    let duration_ms = outcome.duration.as_millis() as u64;
    let succeeded = outcome.result.status != ResultStatus::Failure;

    {
        let mut states = shared.worker_states.write().await;
        if let Some(state) = states.get_mut(&worker_id) {
            state.current_tasks.retain(|id| *id != task_id);
            state.performance.record(duration_ms, succeeded);
            state.status = WorkerStatus::Idle;
        }
    }
    shared.cancel_tokens.write().await.remove(&task_id);

    let completed = outcome.result.counts_as_completed();
    let to = if completed { TaskStatus::Completed } else { TaskStatus::Failed };
    {
        let mut store = shared.task_store.write().await;
        // An already-cancelled task may have left Pending/Blocked rather
        // than InProgress; transition only accepts an InProgress source,
        // so a stale completion from a cancelled task is a harmless no-op.
        let _ = store.transition(task_id, TaskStatus::InProgress, to);
    }
    let blocked = {
        let mut graph = shared.graph.write().await;
        if completed {
            graph.mark_completed(task_id);
            Vec::new()
        } else {
            graph.mark_failed(task_id, shared.config.cascade_on_failure)
        }
    };
    apply_cascade_blocked(shared, blocked).await;

    shared.event_bus.publish(
        EventType::TaskCompleted,
        serde_json::json!({
            "task_id": task_id.to_string(),
            "worker_id": worker_id.to_string(),
            "status": format!("{:?}", outcome.result.status),
            "errors": outcome.result.errors,
        }),
    );
    shared.event_bus.publish(
        EventType::WorkerStatusChanged,
        serde_json::json!({ "worker_id": worker_id.to_string(), "status": "idle" }),
    );

    shared.notify.notify_waiters();
}

async fn sweep_expired_leases(shared: &Arc<Shared>) {
    let expired = shared.lock_manager.sweep(Utc::now());
    for lock in expired {
        shared.event_bus.publish(
            EventType::LockExpired,
            serde_json::json!({
                "path": lock.path.display().to_string(),
                "task_id": lock.task_id.to_string(),
                "worker_id": lock.worker_id.to_string(),
            }),
        );
    }
}

async fn fail_task_as_aborted(shared: &Arc<Shared>, task: &Task, conflicts: &[Conflict]) {
    {
        let mut store = shared.task_store.write().await;
        let _ = store.transition(task.id, TaskStatus::Pending, TaskStatus::Failed);
    }
    let blocked = shared
        .graph
        .write()
        .await
        .mark_failed(task.id, shared.config.cascade_on_failure);
    apply_cascade_blocked(shared, blocked).await;
    shared.event_bus.publish(
        EventType::ConflictDetected,
        serde_json::json!({ "task_id": task.id.to_string(), "conflicts": conflicts.len(), "resolution": "abort" }),
    );
}

/// Mirror the graph's cascade-to-`Blocked` transition onto the task
/// store, so `status()` observes `Blocked` without callers inspecting
/// the graph directly.
async fn apply_cascade_blocked(shared: &Arc<Shared>, blocked: Vec<TaskId>) {
    if blocked.is_empty() {
        return;
    }
    let mut store = shared.task_store.write().await;
    for id in blocked {
        let _ = store.transition(id, TaskStatus::Pending, TaskStatus::Blocked);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::CodeWorker;
    use agentor_types::{Priority, TaskType};
    use std::collections::BTreeMap;

    fn draft(files: Vec<PathBuf>) -> TaskDraft {
        TaskDraft {
            task_type: TaskType::Code,
            priority: Priority::Medium,
            description: "implement".into(),
            dependencies: BTreeSet::new(),
            files,
            context: BTreeMap::new(),
            estimated_duration: None,
            metadata: None,
        }
    }

    fn test_config() -> OrchestratorConfig {
        OrchestratorConfig {
            sweep_interval: Duration::from_secs(3600),
            ..OrchestratorConfig::default()
        }
    }

    #[tokio::test]
    async fn submitted_task_runs_to_completion() {
        let mut registry = WorkerRegistry::new();
        registry.register(CodeWorker::new("code-1", BTreeSet::from([TaskType::Code])));
        let orchestrator = Orchestrator::new(registry, test_config());

        let id = orchestrator.submit(draft(vec![PathBuf::from("a.rs")])).await.unwrap();

        for _ in 0..50 {
            if orchestrator.status(id).await == Some(TaskStatus::Completed) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(orchestrator.status(id).await, Some(TaskStatus::Completed));
        orchestrator.shutdown(Duration::from_secs(5)).await.unwrap();
    }

    #[tokio::test]
    async fn dependency_is_accepted_and_does_not_create_a_cycle() {
        let mut registry = WorkerRegistry::new();
        registry.register(CodeWorker::new("code-1", BTreeSet::from([TaskType::Code])));
        let orchestrator = Orchestrator::new(registry, test_config());

        let first = orchestrator.submit(draft(vec![PathBuf::from("a.rs")])).await.unwrap();
        let mut second = draft(vec![PathBuf::from("b.rs")]);
        second.dependencies.insert(first);
        assert!(orchestrator.submit(second).await.is_ok());

        orchestrator.shutdown(Duration::from_secs(5)).await.unwrap();
    }

    #[tokio::test]
    async fn queue_full_rejects_further_submissions() {
        let mut registry = WorkerRegistry::new();
        registry.register(CodeWorker::new("code-1", BTreeSet::from([TaskType::Code])));
        let mut config = test_config();
        config.task_queue_size = std::num::NonZeroUsize::new(1).unwrap();
        let orchestrator = Orchestrator::new(registry, config);

        orchestrator.submit(draft(vec![PathBuf::from("a.rs")])).await.unwrap();
        let err = orchestrator.submit(draft(vec![PathBuf::from("b.rs")])).await.unwrap_err();
        assert!(matches!(err, SubmitError::QueueFull));

        orchestrator.shutdown(Duration::from_secs(5)).await.unwrap();
    }

    #[tokio::test]
    async fn cancel_pending_task_marks_it_failed() {
        let registry = WorkerRegistry::new(); // no workers, task stays pending
        let orchestrator = Orchestrator::new(registry, test_config());

        let id = orchestrator.submit(draft(vec![PathBuf::from("a.rs")])).await.unwrap();
        orchestrator.cancel(id).await.unwrap();
        assert_eq!(orchestrator.status(id).await, Some(TaskStatus::Failed));

        orchestrator.shutdown(Duration::from_secs(5)).await.unwrap();
    }

    #[tokio::test]
    async fn abort_strategy_rejects_conflicting_submission() {
        let mut registry = WorkerRegistry::new();
        registry.register(CodeWorker::new("code-1", BTreeSet::from([TaskType::Code])));
        let mut config = test_config();
        config.conflict_strategy = ConflictStrategy::Abort;
        config.max_concurrent_tasks = std::num::NonZeroUsize::new(1).unwrap();
        let orchestrator = Orchestrator::new(registry, config);

        orchestrator.submit(draft(vec![PathBuf::from("shared.rs")])).await.unwrap();
        let err = orchestrator
            .submit(draft(vec![PathBuf::from("shared.rs")]))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::ConflictAborted(_)));

        orchestrator.shutdown(Duration::from_secs(5)).await.unwrap();
    }
}
