//! Shared task-execution envelope wrapping every concrete [`Worker`].
//!
//! Ported from `lifecycle::run_agent_lifecycle`: the sequence (assign,
//! spawn/execute, collect, evaluate) is identical across every concrete
//! implementation, so it lives once here rather than being duplicated
//! per archetype.

use std::path::PathBuf;
use std::time::Duration;

use agentor_types::{ErrorCode, ResultStatus, Task, TaskMetrics, TaskResult, WorkerId, WorkerStatus};
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::lock::{LockError, LockManager, LockMode};
use crate::retry::{self, RetryConfig, RetryCounters};

use super::trait_def::Worker;

/// Outcome of running a task through its full lifecycle.
#[derive(Debug, Clone)]
pub struct LifecycleOutcome {
    pub result: TaskResult,
    /// Wall time spent in `execute` across every attempt, for the
    /// caller's performance counters.
    pub duration: Duration,
}

fn failure_result(code: ErrorCode, message: String, duration: Duration) -> LifecycleOutcome {
    LifecycleOutcome {
        result: TaskResult {
            status: ResultStatus::Failure,
            files_modified: vec![],
            files_created: vec![],
            files_deleted: vec![],
            output: None,
            errors: vec![format!("{code}: {message}")],
            warnings: vec![],
            metrics: TaskMetrics {
                duration_ms: duration.as_millis() as u64,
                ..TaskMetrics::default()
            },
        },
        duration,
    }
}

/// Run `task` to completion on `worker`: validate capability fit, acquire
/// write leases on `task.files`, execute under the retry engine, release
/// leases, and return the terminal [`TaskResult`] (§4.3).
#[allow(clippy::too_many_arguments)]
pub async fn run_task_lifecycle(
    worker: &dyn Worker,
    worker_id: WorkerId,
    task: &Task,
    lock_manager: &LockManager,
    lease_duration: Duration,
    retry_config: &RetryConfig,
    retry_counters: &RetryCounters,
    cancel: CancellationToken,
) -> LifecycleOutcome {
    let started = std::time::Instant::now();

    // 1. Capability fit.
    if !worker
        .capabilities()
        .can_handle(task.task_type, &task.files)
    {
        return failure_result(
            ErrorCode::Incompatible,
            format!("worker {worker_id} cannot handle task {}", task.id),
            started.elapsed(),
        );
    }

    // 2. Acquire write leases.
    let now = Utc::now();
    let locks = match lock_manager.acquire(
        &task.files,
        task.id,
        worker_id,
        LockMode::Write,
        lease_duration,
        now,
    ) {
        Ok(locks) => locks,
        Err(LockError::Conflict { paths }) => {
            return failure_result(
                ErrorCode::Conflict,
                format!("lease conflict on {} path(s)", paths.len()),
                started.elapsed(),
            );
        }
        Err(LockError::Expired { path, .. }) => {
            return failure_result(
                ErrorCode::Conflict,
                format!("lease already expired for {}", path.display()),
                started.elapsed(),
            );
        }
    };
    let held_paths: Vec<PathBuf> = locks.iter().map(|l| l.path.clone()).collect();

    // 3. Mark worker busy.
    worker.set_status(WorkerStatus::Busy);

    // 4. Execute under the retry engine.
    let outcome = loop {
        if cancel.is_cancelled() {
            break failure_result(ErrorCode::Cancelled, "task cancelled".into(), started.elapsed());
        }

        let attempt = retry_counters.record_attempt(task.id, "execute");

        tokio::select! {
            exec = worker.execute(task) => {
                match exec {
                    Ok(result) => {
                        retry_counters.clear(task.id, "execute");
                        break LifecycleOutcome {
                            result: with_duration(result, started.elapsed()),
                            duration: started.elapsed(),
                        };
                    }
                    Err(err) => {
                        match retry::decide(retry_config, err.code, attempt) {
                            retry::RetryDecision::RetryAfter(delay) => {
                                tracing::info!(
                                    task_id = %task.id,
                                    worker_id = %worker_id,
                                    attempt = attempt,
                                    delay_ms = delay.as_millis() as u64,
                                    "task execution failed, retrying"
                                );
                                tokio::select! {
                                    _ = tokio::time::sleep(delay) => {}
                                    _ = cancel.cancelled() => {
                                        break failure_result(ErrorCode::Cancelled, "task cancelled during backoff".into(), started.elapsed());
                                    }
                                }
                                continue;
                            }
                            retry::RetryDecision::GiveUp => {
                                retry_counters.clear(task.id, "execute");
                                break failure_result(err.code, err.message, started.elapsed());
                            }
                        }
                    }
                }
            }
            _ = cancel.cancelled() => {
                break failure_result(ErrorCode::Cancelled, "task cancelled".into(), started.elapsed());
            }
        }
    };

    // 6. Always release leases, regardless of outcome.
    lock_manager.release(&held_paths, task.id);
    worker.set_status(WorkerStatus::Idle);

    outcome
}

fn with_duration(mut result: TaskResult, duration: Duration) -> TaskResult {
    result.metrics.duration_ms = duration.as_millis() as u64;
    result
}
