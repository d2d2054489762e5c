use std::sync::Arc;

use agentor_core::Orchestrator;

pub async fn run(orchestrator: &Arc<Orchestrator>) {
    for worker in orchestrator.worker_statuses().await {
        println!(
            "{} ({}) status={:?} in_flight={} locks={}",
            worker.capability.name,
            worker.id,
            worker.status,
            worker.in_flight(),
            worker.held_locks.len(),
        );
    }
}
