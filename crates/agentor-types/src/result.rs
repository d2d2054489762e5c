//! The result a worker produces for a completed (or failed) task.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Outcome of a single `execute` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Failure,
    /// Completed successfully but with warnings (§4.3 item 7).
    Partial,
}

/// Timing and size metrics for a completed task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskMetrics {
    pub duration_ms: u64,
    pub lines_changed: u64,
    pub test_delta: Option<i64>,
    pub coverage_delta: Option<f32>,
}

/// What a worker reports back after running `execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub status: ResultStatus,
    #[serde(default)]
    pub files_modified: Vec<PathBuf>,
    #[serde(default)]
    pub files_created: Vec<PathBuf>,
    #[serde(default)]
    pub files_deleted: Vec<PathBuf>,
    pub output: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub metrics: TaskMetrics,
}

impl TaskResult {
    /// Whether this result should be treated as `Completed` for dependency
    /// release purposes (`Success` and `Partial` both count; `Failure`
    /// does not).
    pub fn counts_as_completed(&self) -> bool {
        matches!(self.status, ResultStatus::Success | ResultStatus::Partial)
    }

    pub fn is_partial(&self) -> bool {
        self.status == ResultStatus::Partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_counts_as_completed() {
        let r = TaskResult {
            status: ResultStatus::Partial,
            files_modified: vec![],
            files_created: vec![],
            files_deleted: vec![],
            output: None,
            errors: vec![],
            warnings: vec!["be careful".into()],
            metrics: TaskMetrics::default(),
        };
        assert!(r.counts_as_completed());
        assert!(r.is_partial());
    }

    #[test]
    fn failure_does_not_count_as_completed() {
        let r = TaskResult {
            status: ResultStatus::Failure,
            files_modified: vec![],
            files_created: vec![],
            files_deleted: vec![],
            output: None,
            errors: vec!["boom".into()],
            warnings: vec![],
            metrics: TaskMetrics::default(),
        };
        assert!(!r.counts_as_completed());
    }
}
