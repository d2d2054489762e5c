use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use agentor_core::Orchestrator;
use agentor_types::{Priority, TaskDraft, TaskType};

pub async fn run(orchestrator: &Arc<Orchestrator>, args: &[&str]) {
    let [task_type, priority, files @ ..] = args else {
        eprintln!("usage: submit <type> <priority> <file> [<file> ...]");
        return;
    };

    let task_type: TaskType = match task_type.parse() {
        Ok(t) => t,
        Err(e) => return eprintln!("{e}"),
    };
    let priority: Priority = match priority.parse() {
        Ok(p) => p,
        Err(e) => return eprintln!("{e}"),
    };
    if files.is_empty() {
        return eprintln!("at least one file is required");
    }

    let draft = TaskDraft {
        task_type,
        priority,
        description: format!("{task_type} task over {} file(s)", files.len()),
        dependencies: BTreeSet::new(),
        files: files.iter().map(|f| PathBuf::from(*f)).collect(),
        context: BTreeMap::new(),
        estimated_duration: None,
        metadata: None,
    };

    match orchestrator.submit(draft).await {
        Ok(id) => println!("submitted {id}"),
        Err(e) => eprintln!("submit rejected: {e}"),
    }
}
