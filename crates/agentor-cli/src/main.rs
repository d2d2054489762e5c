mod commands;
mod config;
mod repl;

use std::collections::BTreeSet;

use agentor_core::worker::{CodeWorker, DocsWorker, RefactorWorker, ReviewWorker, TestWorker};
use agentor_core::{Orchestrator, WorkerRegistry};
use agentor_types::TaskType;
use anyhow::Result;
use clap::Parser;

use config::CliOverrides;

/// Run the task orchestrator as a single in-process binary and drive it
/// from a line-oriented REPL on stdin.
///
/// There is no server or database here (§ non-goals): the orchestrator's
/// entire state lives in this process's memory for the lifetime of the
/// REPL, the same way `gator-cli`'s `Dashboard` command drives one live
/// `gator_core` instance, minus the shared Postgres backing store.
#[derive(Parser)]
#[command(name = "agentor", about = "In-process multi-agent task orchestrator")]
struct Cli {
    /// Maximum tasks dispatched concurrently (overrides AGENT_CONFIG_MAX_CONCURRENT_TASKS)
    #[arg(long)]
    max_concurrent_tasks: Option<usize>,

    /// Submission queue capacity (overrides AGENT_CONFIG_TASK_QUEUE_SIZE)
    #[arg(long)]
    task_queue_size: Option<usize>,

    /// File lock lease duration in milliseconds (overrides AGENT_CONFIG_LEASE_DURATION_MS)
    #[arg(long)]
    lease_duration_ms: Option<u64>,

    /// File conflict resolution strategy: queue, merge, or abort
    #[arg(long)]
    conflict_resolution_strategy: Option<String>,

    /// Whether a non-retryable failure cascades to dependent tasks
    #[arg(long)]
    cascade_on_failure: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let overrides = CliOverrides {
        max_concurrent_tasks: cli.max_concurrent_tasks,
        task_queue_size: cli.task_queue_size,
        lease_duration_ms: cli.lease_duration_ms,
        conflict_resolution_strategy: cli.conflict_resolution_strategy,
        cascade_on_failure: cli.cascade_on_failure,
    };
    let orchestrator_config = config::resolve(&overrides)?;

    let registry = default_registry();
    tracing::info!(workers = registry.len(), "registered default worker archetypes");

    let orchestrator = Orchestrator::new(registry, orchestrator_config);
    repl::run(orchestrator).await
}

/// One worker per archetype, each handling its namesake [`TaskType`] --
/// the same default fleet shape `gator-cli`'s `cmd_init` sets up a
/// config for, just with in-process workers instead of worktree-backed
/// agent processes.
fn default_registry() -> WorkerRegistry {
    let mut registry = WorkerRegistry::new();
    registry.register(CodeWorker::new("code", BTreeSet::from([TaskType::Code])));
    registry.register(TestWorker::new("test", BTreeSet::from([TaskType::Test])));
    registry.register(DocsWorker::new("docs", BTreeSet::from([TaskType::Docs])));
    registry.register(ReviewWorker::new("review", BTreeSet::from([TaskType::Review])));
    registry.register(RefactorWorker::new("refactor", BTreeSet::from([TaskType::Refactor])));
    registry
}
