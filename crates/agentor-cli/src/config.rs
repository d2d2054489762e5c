//! Config file management for the orchestrator binary.
//!
//! Provides a TOML-based config file at `~/.config/agentor/config.toml`
//! and a resolution chain: CLI flag > env var > config file > default,
//! mirroring `gator-cli::config::GatorConfig::resolve` but scoped to
//! orchestrator settings instead of database/auth settings.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use agentor_core::{ConflictStrategy, OrchestratorConfig, RetryConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// On-disk shape of `config.toml`. Every field is optional so a partial
/// file only overrides what it mentions.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub max_concurrent_tasks: Option<usize>,
    pub task_queue_size: Option<usize>,
    pub lease_duration_ms: Option<u64>,
    pub conflict_resolution_strategy: Option<String>,
    pub cascade_on_failure: Option<bool>,
    pub retry: Option<RetrySection>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RetrySection {
    pub max_retries: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
    pub retryable_error_codes: Option<Vec<String>>,
}

/// CLI flags that can override individual settings, parsed by `clap` in
/// `main.rs` and threaded through here rather than resolved again.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub max_concurrent_tasks: Option<usize>,
    pub task_queue_size: Option<usize>,
    pub lease_duration_ms: Option<u64>,
    pub conflict_resolution_strategy: Option<String>,
    pub cascade_on_failure: Option<bool>,
}

/// Return the orchestrator config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/agentor` or
/// `~/.config/agentor`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("agentor");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("agentor")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Load and parse the config file, if one exists. Absence is not an
/// error -- every setting falls back further down the chain.
pub fn load_config() -> Option<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path).ok()?;
    toml::from_str(&contents)
        .inspect_err(|e| tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file"))
        .ok()
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(format!("AGENT_CONFIG_{key}")).ok()
}

/// Resolve an `OrchestratorConfig` via flag > `AGENT_CONFIG_*` env var >
/// config file > [`OrchestratorConfig::default`].
pub fn resolve(overrides: &CliOverrides) -> Result<OrchestratorConfig> {
    let file = load_config().unwrap_or_default();
    let default = OrchestratorConfig::default();

    let max_concurrent_tasks = overrides
        .max_concurrent_tasks
        .or_else(|| env_var("MAX_CONCURRENT_TASKS").and_then(|v| v.parse().ok()))
        .or(file.max_concurrent_tasks)
        .and_then(NonZeroUsize::new)
        .unwrap_or(default.max_concurrent_tasks);

    let task_queue_size = overrides
        .task_queue_size
        .or_else(|| env_var("TASK_QUEUE_SIZE").and_then(|v| v.parse().ok()))
        .or(file.task_queue_size)
        .and_then(NonZeroUsize::new)
        .unwrap_or(default.task_queue_size);

    let lease_duration_ms = overrides
        .lease_duration_ms
        .or_else(|| env_var("LEASE_DURATION_MS").and_then(|v| v.parse().ok()))
        .or(file.lease_duration_ms)
        .unwrap_or(default.lease_duration.as_millis() as u64);

    let conflict_strategy = overrides
        .conflict_resolution_strategy
        .clone()
        .or_else(|| env_var("CONFLICT_RESOLUTION_STRATEGY"))
        .or(file.conflict_resolution_strategy)
        .map(|s| parse_conflict_strategy(&s))
        .transpose()?
        .unwrap_or(default.conflict_strategy);

    let cascade_on_failure = overrides
        .cascade_on_failure
        .or_else(|| env_var("CASCADE_ON_FAILURE").and_then(|v| v.parse().ok()))
        .or(file.cascade_on_failure)
        .unwrap_or(default.cascade_on_failure);

    let retry_config = resolve_retry(file.retry, &default.retry_config)?;

    Ok(OrchestratorConfig {
        max_concurrent_tasks,
        task_queue_size,
        lease_duration: Duration::from_millis(lease_duration_ms),
        conflict_strategy,
        cascade_on_failure,
        retry_config,
        ..default
    })
}

fn resolve_retry(section: Option<RetrySection>, default: &RetryConfig) -> Result<RetryConfig> {
    let section = section.unwrap_or_default();

    let max_retries = section
        .max_retries
        .or_else(|| env_var("RETRY_MAX_RETRIES").and_then(|v| v.parse().ok()))
        .unwrap_or(default.max_retries);
    let base_delay_ms = section
        .base_delay_ms
        .or_else(|| env_var("RETRY_BASE_DELAY_MS").and_then(|v| v.parse().ok()))
        .unwrap_or(default.base_delay.as_millis() as u64);
    let max_delay_ms = section
        .max_delay_ms
        .or_else(|| env_var("RETRY_MAX_DELAY_MS").and_then(|v| v.parse().ok()))
        .unwrap_or(default.max_delay.as_millis() as u64);
    let backoff_multiplier = section
        .backoff_multiplier
        .or_else(|| env_var("RETRY_BACKOFF_MULTIPLIER").and_then(|v| v.parse().ok()))
        .unwrap_or(default.backoff_multiplier);
    let retryable_error_codes = match section
        .retryable_error_codes
        .or_else(|| env_var("RETRY_RETRYABLE_ERROR_CODES").map(|v| v.split(',').map(str::to_string).collect()))
    {
        Some(codes) => Some(
            codes
                .iter()
                .map(|c| c.parse().context("invalid entry in retryable_error_codes"))
                .collect::<Result<Vec<_>>>()?,
        ),
        None => default.retryable_error_codes.clone(),
    };

    Ok(RetryConfig {
        max_retries,
        base_delay: Duration::from_millis(base_delay_ms),
        max_delay: Duration::from_millis(max_delay_ms),
        backoff_multiplier,
        retryable_error_codes,
    })
}

fn parse_conflict_strategy(s: &str) -> Result<ConflictStrategy> {
    match s {
        "queue" => Ok(ConflictStrategy::Queue),
        "merge" => Ok(ConflictStrategy::Merge),
        "abort" => Ok(ConflictStrategy::Abort),
        other => anyhow::bail!("invalid conflict_resolution_strategy: {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_overrides_and_no_file_yield_defaults() {
        let config = resolve(&CliOverrides::default()).unwrap();
        let default = OrchestratorConfig::default();
        assert_eq!(config.max_concurrent_tasks, default.max_concurrent_tasks);
        assert_eq!(config.conflict_strategy, default.conflict_strategy);
    }

    #[test]
    fn cli_override_wins_over_default() {
        let overrides = CliOverrides {
            max_concurrent_tasks: Some(8),
            ..Default::default()
        };
        let config = resolve(&overrides).unwrap();
        assert_eq!(config.max_concurrent_tasks.get(), 8);
    }

    #[test]
    fn rejects_unknown_conflict_strategy() {
        let overrides = CliOverrides {
            conflict_resolution_strategy: Some("bogus".into()),
            ..Default::default()
        };
        assert!(resolve(&overrides).is_err());
    }
}
