//! Polymorphic task executors (§4.3).

pub mod archetypes;
pub mod lifecycle;
pub mod registry;
pub mod trait_def;

pub use archetypes::{CodeWorker, DocsWorker, RefactorWorker, ReviewWorker, TestWorker};
pub use lifecycle::{run_task_lifecycle, LifecycleOutcome};
pub use registry::WorkerRegistry;
pub use trait_def::{ExecuteError, Worker, WorkerObserver};
