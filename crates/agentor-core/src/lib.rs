//! Core orchestration engine: dependency graph, file-lock manager, retry
//! engine, polymorphic workers, conflict detector, event bus, and the
//! scheduler that ties them together (§2).
//!
//! Persistence across restarts is an explicit non-goal; every component
//! here holds its state in memory behind the concurrency primitive that
//! fits its access pattern (a coarse `std::sync::Mutex`/`RwLock` where
//! dispatch cost is dwarfed by task execution, `tokio::sync` primitives
//! where the orchestrator's dispatch loop needs to `.await` on them).

pub mod conflict;
pub mod events;
pub mod graph;
pub mod lock;
pub mod orchestrator;
pub mod retry;
pub mod state;
pub mod transport;
pub mod worker;

pub use conflict::{Conflict, ConflictKind, ConflictStrategy};
pub use events::{EventBus, EventSubscription};
pub use graph::{DependencyGraph, GraphError};
pub use lock::{Lock, LockError, LockManager, LockMode};
pub use orchestrator::{Orchestrator, OrchestratorConfig, OrchestratorError, SubmitError};
pub use retry::{RetryConfig, RetryCounters, RetryDecision};
pub use state::{TaskStateMachine, TaskStore, TransitionError};
pub use transport::{Channel, InProcessChannel};
pub use worker::{run_task_lifecycle, ExecuteError, Worker, WorkerRegistry};
