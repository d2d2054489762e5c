//! S5: T2 depends on T1. T1 fails with a non-retryable error and
//! `cascade_on_failure=true`. Expect T1 `failed`, T2 transitions to
//! `blocked` (this crate's analogue of gator's `DEPENDENCY_FAILED`
//! synthetic code), and T2 never dispatches.

use std::collections::BTreeSet;
use std::time::Duration;

use agentor_core::{Orchestrator, OrchestratorConfig, WorkerRegistry};
use agentor_test_utils::{draft, Script, ScriptedWorker};
use agentor_types::{ErrorCode, TaskStatus, TaskType};

#[tokio::test]
async fn dependency_failure_blocks_dependent_without_dispatching_it() {
    let (worker, invocations) = ScriptedWorker::with_counter(
        "code-1",
        BTreeSet::from([TaskType::Code]),
        vec![Script::Fail(ErrorCode::PermissionDenied)],
    );
    let mut registry = WorkerRegistry::new();
    registry.register(worker);

    let mut config = OrchestratorConfig::default();
    config.cascade_on_failure = true;
    let orchestrator = Orchestrator::new(registry, config);

    let t1 = orchestrator.submit(draft(vec!["a"])).await.unwrap();
    let mut t2_draft = draft(vec!["b"]);
    t2_draft.dependencies.insert(t1);
    let t2 = orchestrator.submit(t2_draft).await.unwrap();

    let mut t1_failed = false;
    for _ in 0..100 {
        if orchestrator.status(t1).await == Some(TaskStatus::Failed) {
            t1_failed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(t1_failed, "T1 should reach failed");

    // Give the dispatch loop a chance to act on the cascade before
    // asserting T2 never moved past blocked.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(orchestrator.status(t2).await, Some(TaskStatus::Blocked));
    assert_eq!(invocations.load(std::sync::atomic::Ordering::SeqCst), 1);

    orchestrator.shutdown(Duration::from_secs(5)).await.unwrap();
}
