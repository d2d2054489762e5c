use std::sync::Arc;

use agentor_core::Orchestrator;
use agentor_types::TaskId;

pub async fn run(orchestrator: &Arc<Orchestrator>, args: &[&str]) {
    match args {
        [] => {
            for task in orchestrator.all_tasks().await {
                println!("{} {} {} {}", task.id, task.status, task.task_type, task.description);
            }
        }
        [raw_id] => match parse_task_id(raw_id) {
            Ok(id) => match orchestrator.status(id).await {
                Some(status) => println!("{id} {status}"),
                None => eprintln!("no such task {id}"),
            },
            Err(e) => eprintln!("{e}"),
        },
        _ => eprintln!("usage: status [<task-id>]"),
    }
}

fn parse_task_id(raw: &str) -> Result<TaskId, uuid::Error> {
    raw.parse::<uuid::Uuid>().map(TaskId::from)
}
