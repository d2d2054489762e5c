//! S2: T2 depends on T1. T1 must dispatch and complete before T2 becomes
//! ready, and T2 reaches completion within one further scheduling tick.

use std::collections::BTreeSet;
use std::time::Duration;

use agentor_core::{Orchestrator, OrchestratorConfig, WorkerRegistry};
use agentor_test_utils::draft;
use agentor_types::{TaskStatus, TaskType};

async fn wait_for(orchestrator: &Orchestrator, id: agentor_types::TaskId, want: TaskStatus) -> bool {
    for _ in 0..100 {
        if orchestrator.status(id).await == Some(want) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn second_task_dispatches_only_after_first_completes() {
    let mut registry = WorkerRegistry::new();
    registry.register(agentor_core::worker::CodeWorker::new(
        "code-1",
        BTreeSet::from([TaskType::Code]),
    ));
    let orchestrator = Orchestrator::new(registry, OrchestratorConfig::default());

    let t1 = orchestrator.submit(draft(vec!["a"])).await.unwrap();
    let mut t2_draft = draft(vec!["b"]);
    t2_draft.dependencies.insert(t1);
    let t2 = orchestrator.submit(t2_draft).await.unwrap();

    assert!(wait_for(&orchestrator, t1, TaskStatus::Completed).await);
    assert!(wait_for(&orchestrator, t2, TaskStatus::Completed).await);

    orchestrator.shutdown(Duration::from_secs(5)).await.unwrap();
}
