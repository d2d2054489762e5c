//! Observable worker state (§3 "Worker State").

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::ids::{TaskId, WorkerId};

/// Coarse worker lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Idle,
    Busy,
    Error,
    Offline,
}

/// Rolling performance counters kept per worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceCounters {
    pub tasks_completed: u64,
    pub average_duration_ms: f64,
    pub success_rate: f64,
}

impl PerformanceCounters {
    /// Fold in one more completed task's duration and outcome.
    pub fn record(&mut self, duration_ms: u64, succeeded: bool) {
        let prev_successes = (self.success_rate * self.tasks_completed as f64).round();
        let prev_total_duration = self.average_duration_ms * self.tasks_completed as f64;

        self.tasks_completed += 1;
        self.average_duration_ms = (prev_total_duration + duration_ms as f64) / self.tasks_completed as f64;

        let successes = prev_successes + if succeeded { 1.0 } else { 0.0 };
        self.success_rate = successes / self.tasks_completed as f64;
    }
}

/// A point-in-time snapshot of a worker's observable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerState {
    pub id: WorkerId,
    pub name: String,
    pub status: WorkerStatus,
    pub current_tasks: Vec<TaskId>,
    pub held_locks: Vec<std::path::PathBuf>,
    pub capability: Capability,
    pub performance: PerformanceCounters,
}

impl WorkerState {
    /// Number of tasks this worker is currently executing.
    pub fn in_flight(&self) -> usize {
        self.current_tasks.len()
    }

    /// Whether this worker has spare capacity under its capability's
    /// `max_concurrent_tasks` cap.
    pub fn has_capacity(&self) -> bool {
        self.in_flight() < self.capability.max_concurrent_tasks.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn performance_counters_average_two_samples() {
        let mut perf = PerformanceCounters::default();
        perf.record(100, true);
        perf.record(300, false);
        assert_eq!(perf.tasks_completed, 2);
        assert!((perf.average_duration_ms - 200.0).abs() < f64::EPSILON);
        assert!((perf.success_rate - 0.5).abs() < f64::EPSILON);
    }
}
