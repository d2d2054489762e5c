//! S6: T1 is in-flight at a cooperative suspension point; `cancel(T1)` is
//! invoked. Expect T1 to terminate within one suspension cycle, and its
//! lease on `files` to be released so a subsequent task can acquire it.

use std::collections::BTreeSet;
use std::time::Duration;

use agentor_core::{Orchestrator, OrchestratorConfig, WorkerRegistry};
use agentor_test_utils::{draft, BlockingWorker};
use agentor_types::{TaskStatus, TaskType};

#[tokio::test]
async fn cancel_terminates_in_flight_task_and_releases_its_lease() {
    let mut registry = WorkerRegistry::new();
    registry.register(BlockingWorker::new("blocker", BTreeSet::from([TaskType::Code])));

    let orchestrator = Orchestrator::new(registry, OrchestratorConfig::default());
    let id = orchestrator.submit(draft(vec!["a.rs"])).await.unwrap();

    let mut in_progress = false;
    for _ in 0..100 {
        if orchestrator.status(id).await == Some(TaskStatus::InProgress) {
            in_progress = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(in_progress, "T1 never entered in_progress");

    orchestrator.cancel(id).await.unwrap();

    let mut failed = false;
    for _ in 0..100 {
        if orchestrator.status(id).await == Some(TaskStatus::Failed) {
            failed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(failed, "cancelled task should terminate as failed");

    // Never re-enters in_progress.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(orchestrator.status(id).await, Some(TaskStatus::Failed));

    // A second task over the same file can now acquire it.
    let id2 = orchestrator.submit(draft(vec!["a.rs"])).await.unwrap();
    let mut second_in_progress = false;
    for _ in 0..100 {
        if orchestrator.status(id2).await == Some(TaskStatus::InProgress) {
            second_in_progress = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(second_in_progress, "released lease should allow dispatch of the next task");

    // id2's worker blocks forever; cancel it too so shutdown can drain.
    orchestrator.cancel(id2).await.unwrap();
    orchestrator.shutdown(Duration::from_secs(5)).await.unwrap();
}
