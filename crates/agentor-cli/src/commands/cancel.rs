use std::sync::Arc;

use agentor_core::Orchestrator;
use agentor_types::TaskId;

pub async fn run(orchestrator: &Arc<Orchestrator>, args: &[&str]) {
    let [raw_id] = args else {
        return eprintln!("usage: cancel <task-id>");
    };

    let id = match raw_id.parse::<uuid::Uuid>().map(TaskId::from) {
        Ok(id) => id,
        Err(e) => return eprintln!("{e}"),
    };

    match orchestrator.cancel(id).await {
        Ok(()) => println!("cancelled {id}"),
        Err(e) => eprintln!("cancel failed: {e}"),
    }
}
