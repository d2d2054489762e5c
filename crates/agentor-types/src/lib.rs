//! Shared data types for the task orchestrator: tasks, capabilities,
//! messages, results, worker state, events, and the error taxonomy.
//!
//! This crate holds no runtime behavior beyond construction and
//! self-contained validation; the orchestrator, lock manager, retry
//! engine, and worker registry that act on these types live in
//! `agentor-core`.

pub mod capability;
pub mod error;
pub mod event;
pub mod ids;
pub mod message;
pub mod result;
pub mod task;
pub mod validate;
pub mod worker_state;

pub use capability::Capability;
pub use error::{ErrorCode, ErrorCodeParseError};
pub use event::{Event, EventType};
pub use ids::{LockId, TaskId, WorkerId};
pub use message::{Message, MessageType};
pub use result::{ResultStatus, TaskMetrics, TaskResult};
pub use task::{Priority, Task, TaskDraft, TaskStatus, TaskType};
pub use validate::{validate_message, validate_task_draft, ValidationError};
pub use worker_state::{PerformanceCounters, WorkerState, WorkerStatus};
