//! Retry engine: categorizes failures into a stable [`ErrorCode`], computes
//! exponential backoff with jitter, and bounds the number of attempts
//! (§4.2).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use agentor_types::{ErrorCode, TaskId};
use rand::Rng;

/// Retry policy for one worker or one orchestrator-wide default.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Codes eligible for retry, or `None` for "everything not always
    /// non-retryable" (the `*` wildcard in §4.2).
    pub retryable_error_codes: Option<Vec<ErrorCode>>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            retryable_error_codes: None,
        }
    }
}

impl RetryConfig {
    /// Whether an error of this code may be retried under this policy.
    /// `PermissionDenied`, `ParseError`, `ValidationError`, `FileNotFound`
    /// are never retryable regardless of configuration.
    pub fn is_retryable(&self, code: ErrorCode) -> bool {
        if code.is_always_non_retryable() {
            return false;
        }
        match &self.retryable_error_codes {
            None => true,
            Some(codes) => codes.contains(&code),
        }
    }

    /// Compute the delay before the given attempt (0-indexed), including
    /// jitter in `[0, 0.1 * computed)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let computed =
            self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped = computed.min(self.max_delay.as_secs_f64());
        let jitter = rand::rng().random_range(0.0..(0.1 * capped).max(f64::EPSILON));
        Duration::from_secs_f64((capped + jitter).min(self.max_delay.as_secs_f64() * 1.1))
    }
}

/// Map a raw failure cause to a stable [`ErrorCode`].
///
/// Workers report failures as free-form strings or `anyhow::Error`s; the
/// retry engine never matches on that text directly (it would be brittle
/// across worker implementations), so every worker's `execute` is
/// expected to classify its own failures up front. This categorizer
/// exists for the cases where only a string is available (e.g. a panic
/// message captured by `catch_unwind`, or glue code translating an I/O
/// error).
pub fn categorize_io_error(err: &std::io::Error) -> ErrorCode {
    use std::io::ErrorKind;
    match err.kind() {
        ErrorKind::NotFound => ErrorCode::FileNotFound,
        ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
        ErrorKind::TimedOut => ErrorCode::Timeout,
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected => ErrorCode::NetworkError,
        _ => ErrorCode::Unknown,
    }
}

/// Per-task, per-operation attempt counters. Cleared on success or final
/// failure so the map never grows unbounded over a long-running process.
#[derive(Default)]
pub struct RetryCounters {
    attempts: Mutex<HashMap<(TaskId, String), u32>>,
}

impl RetryCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more attempt at `operation` for `task_id` and return the
    /// new attempt count (1-indexed: the count after this attempt).
    pub fn record_attempt(&self, task_id: TaskId, operation: &str) -> u32 {
        let mut attempts = self.attempts.lock().expect("retry counters mutex poisoned");
        let entry = attempts.entry((task_id, operation.to_string())).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Clear the counter for `(task_id, operation)` on success or final
    /// failure.
    pub fn clear(&self, task_id: TaskId, operation: &str) {
        self.attempts
            .lock()
            .expect("retry counters mutex poisoned")
            .remove(&(task_id, operation.to_string()));
    }

    pub fn current(&self, task_id: TaskId, operation: &str) -> u32 {
        *self
            .attempts
            .lock()
            .expect("retry counters mutex poisoned")
            .get(&(task_id, operation.to_string()))
            .unwrap_or(&0)
    }
}

/// Decision returned by [`decide`] after a failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Retry after the given delay.
    RetryAfter(Duration),
    /// Exhausted or non-retryable: give up.
    GiveUp,
}

/// Decide whether to retry, given the config, the error code, and the
/// attempt number just made (1-indexed, i.e. the value returned from
/// [`RetryCounters::record_attempt`]).
pub fn decide(config: &RetryConfig, code: ErrorCode, attempt: u32) -> RetryDecision {
    if !config.is_retryable(code) {
        return RetryDecision::GiveUp;
    }
    // attempt counts attempts made so far; max_retries additional retries
    // are allowed beyond the first try, i.e. max_retries + 1 tries total
    // (§8 property 5).
    if attempt > config.max_retries {
        return RetryDecision::GiveUp;
    }
    RetryDecision::RetryAfter(config.backoff_delay(attempt - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_non_retryable_codes_give_up_regardless_of_config() {
        let config = RetryConfig {
            retryable_error_codes: Some(vec![ErrorCode::FileNotFound]),
            ..RetryConfig::default()
        };
        assert_eq!(decide(&config, ErrorCode::FileNotFound, 1), RetryDecision::GiveUp);
    }

    #[test]
    fn wildcard_retries_unlisted_codes() {
        let config = RetryConfig::default();
        assert!(matches!(
            decide(&config, ErrorCode::Timeout, 1),
            RetryDecision::RetryAfter(_)
        ));
    }

    #[test]
    fn exhausts_after_max_retries_plus_one_attempts() {
        let config = RetryConfig {
            max_retries: 2,
            ..RetryConfig::default()
        };
        assert!(matches!(decide(&config, ErrorCode::Timeout, 1), RetryDecision::RetryAfter(_)));
        assert!(matches!(decide(&config, ErrorCode::Timeout, 2), RetryDecision::RetryAfter(_)));
        assert!(matches!(decide(&config, ErrorCode::Timeout, 3), RetryDecision::RetryAfter(_)));
        assert_eq!(decide(&config, ErrorCode::Timeout, 4), RetryDecision::GiveUp);
    }

    #[test]
    fn backoff_delay_is_capped_and_nondecreasing() {
        let config = RetryConfig {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(200),
            backoff_multiplier: 10.0,
            ..RetryConfig::default()
        };
        let d = config.backoff_delay(5);
        assert!(d.as_secs_f64() <= config.max_delay.as_secs_f64() * 1.1 + 0.01);
    }

    #[test]
    fn counters_clear_resets_to_zero() {
        let counters = RetryCounters::new();
        let task = TaskId::new();
        counters.record_attempt(task, "execute");
        counters.record_attempt(task, "execute");
        assert_eq!(counters.current(task, "execute"), 2);
        counters.clear(task, "execute");
        assert_eq!(counters.current(task, "execute"), 0);
    }

    #[test]
    fn counters_are_keyed_per_operation() {
        let counters = RetryCounters::new();
        let task = TaskId::new();
        counters.record_attempt(task, "execute");
        counters.record_attempt(task, "acquire_lock");
        assert_eq!(counters.current(task, "execute"), 1);
        assert_eq!(counters.current(task, "acquire_lock"), 1);
    }
}
