//! Orchestrator-wide configuration (§6). The CLI's resolution chain
//! (flag > env > file > default) lives in `agentor-cli`, mirroring how
//! `gator-core::orchestrator::OrchestratorConfig` is a plain settings
//! struct while `gator-cli::config::GatorConfig::resolve` does the
//! layered lookup.

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::conflict::ConflictStrategy;
use crate::retry::RetryConfig;

/// Default lease duration: 30 minutes (§6 `lease_duration_ms`).
pub const DEFAULT_LEASE_DURATION_MS: u64 = 1_800_000;

/// Default lease-sweep tick (§5: "periodic lease-sweep tick, default
/// every 60s").
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_concurrent_tasks: NonZeroUsize,
    pub task_queue_size: NonZeroUsize,
    pub lease_duration: Duration,
    pub sweep_interval: Duration,
    pub conflict_strategy: ConflictStrategy,
    /// Default `true`: overrides gator's hand-parsed default of `false`
    /// to avoid dependents waiting forever with no operator loop to
    /// unstick them (§9 Open Questions).
    pub cascade_on_failure: bool,
    pub retry_config: RetryConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: NonZeroUsize::new(4).unwrap(),
            task_queue_size: NonZeroUsize::new(1024).unwrap(),
            lease_duration: Duration::from_millis(DEFAULT_LEASE_DURATION_MS),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            conflict_strategy: ConflictStrategy::Queue,
            cascade_on_failure: true,
            retry_config: RetryConfig::default(),
        }
    }
}
