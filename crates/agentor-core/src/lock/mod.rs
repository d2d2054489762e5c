//! File-lock manager: grants, releases, and expires per-path exclusive or
//! shared leases.
//!
//! All state lives behind a single `Mutex` (the same serialization
//! rationale `WorktreeManager` uses for git operations: lock contention is
//! never the bottleneck here, task execution is) so `acquire` can install
//! an all-or-nothing grant across a whole path set in one critical
//! section.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use agentor_types::{LockId, TaskId, WorkerId};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Whether a lock excludes other writers only, or everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Read,
    Write,
}

/// A single granted lease.
#[derive(Debug, Clone)]
pub struct Lock {
    pub id: LockId,
    pub path: PathBuf,
    pub task_id: TaskId,
    pub worker_id: WorkerId,
    pub mode: LockMode,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Errors from [`LockManager::acquire`].
#[derive(Debug, Error, Clone)]
pub enum LockError {
    #[error("lock conflict on {} path(s): {}", .paths.len(), paths_display(.paths))]
    Conflict { paths: Vec<PathBuf> },

    /// Raised by a worker that discovers its lease was swept out from
    /// under it mid-execution. Fatal for the holding task (§4.1).
    #[error("lease for {path} expired while task {task_id} was still running")]
    Expired { path: PathBuf, task_id: TaskId },
}

fn paths_display(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Default lease duration: 30 minutes (§6 `lease_duration_ms` default).
pub const DEFAULT_LEASE_DURATION: Duration = Duration::from_millis(1_800_000);

#[derive(Default)]
struct LockTable {
    /// Every path currently under lock, zero-or-one write lease XOR any
    /// number of read leases.
    by_path: HashMap<PathBuf, Vec<Lock>>,
}

impl LockTable {
    fn conflicts(&self, path: &Path, mode: LockMode, task_id: TaskId) -> bool {
        let Some(held) = self.by_path.get(path) else {
            return false;
        };
        held.iter().any(|l| {
            if l.task_id == task_id {
                return false;
            }
            match (mode, l.mode) {
                (LockMode::Write, _) | (_, LockMode::Write) => true,
                (LockMode::Read, LockMode::Read) => false,
            }
        })
    }
}

/// Grants, releases, and expires file-path leases.
pub struct LockManager {
    table: Mutex<LockTable>,
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(LockTable::default()),
        }
    }

    /// Atomically acquire a lease on every path in `paths`, or none of
    /// them. All-or-nothing acquisition is what rules out deadlock: a
    /// caller never holds a partial grant that it then blocks waiting to
    /// complete.
    pub fn acquire(
        &self,
        paths: &[PathBuf],
        task_id: TaskId,
        worker_id: WorkerId,
        mode: LockMode,
        lease_duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<Lock>, LockError> {
        let mut table = self.table.lock().expect("lock manager mutex poisoned");

        let conflicting: Vec<PathBuf> = paths
            .iter()
            .filter(|p| table.conflicts(p, mode, task_id))
            .cloned()
            .collect();
        if !conflicting.is_empty() {
            return Err(LockError::Conflict {
                paths: conflicting,
            });
        }

        let expires_at = now
            + chrono::Duration::from_std(lease_duration).unwrap_or_else(|_| chrono::Duration::days(365));

        let mut granted = Vec::with_capacity(paths.len());
        for path in paths {
            let lock = Lock {
                id: LockId::new(),
                path: path.clone(),
                task_id,
                worker_id,
                mode,
                acquired_at: now,
                expires_at,
            };
            table
                .by_path
                .entry(path.clone())
                .or_default()
                .push(lock.clone());
            granted.push(lock);
        }

        Ok(granted)
    }

    /// Release every lock this task holds on the given paths. Idempotent:
    /// a path with no matching lock is silently skipped (§8 property 7).
    pub fn release(&self, paths: &[PathBuf], task_id: TaskId) {
        let mut table = self.table.lock().expect("lock manager mutex poisoned");
        for path in paths {
            if let Some(locks) = table.by_path.get_mut(path) {
                locks.retain(|l| l.task_id != task_id);
                if locks.is_empty() {
                    table.by_path.remove(path);
                }
            }
        }
    }

    /// Remove every lease whose `expires_at <= now`, returning the expired
    /// locks so the caller can emit `LockExpired` events.
    pub fn sweep(&self, now: DateTime<Utc>) -> Vec<Lock> {
        let mut table = self.table.lock().expect("lock manager mutex poisoned");
        let mut expired = Vec::new();
        table.by_path.retain(|_, locks| {
            let (still_live, just_expired): (Vec<_>, Vec<_>) =
                locks.drain(..).partition(|l| l.expires_at > now);
            expired.extend(just_expired);
            *locks = still_live;
            !locks.is_empty()
        });
        expired
    }

    /// Number of distinct paths currently under lock. Exposed for tests
    /// and diagnostics only.
    pub fn locked_path_count(&self) -> usize {
        self.table.lock().expect("lock manager mutex poisoned").by_path.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn acquire_grants_write_lease() {
        let mgr = LockManager::new();
        let task = TaskId::new();
        let worker = WorkerId::new();
        let paths = vec![PathBuf::from("a.rs")];
        let locks = mgr
            .acquire(&paths, task, worker, LockMode::Write, DEFAULT_LEASE_DURATION, now())
            .unwrap();
        assert_eq!(locks.len(), 1);
        assert_eq!(mgr.locked_path_count(), 1);
    }

    #[test]
    fn second_write_acquire_on_same_path_conflicts() {
        let mgr = LockManager::new();
        let paths = vec![PathBuf::from("a.rs")];
        mgr.acquire(&paths, TaskId::new(), WorkerId::new(), LockMode::Write, DEFAULT_LEASE_DURATION, now())
            .unwrap();

        let err = mgr
            .acquire(&paths, TaskId::new(), WorkerId::new(), LockMode::Write, DEFAULT_LEASE_DURATION, now())
            .unwrap_err();
        assert!(matches!(err, LockError::Conflict { .. }));
    }

    #[test]
    fn acquire_is_all_or_nothing() {
        let mgr = LockManager::new();
        let held = PathBuf::from("held.rs");
        let free = PathBuf::from("free.rs");
        mgr.acquire(&[held.clone()], TaskId::new(), WorkerId::new(), LockMode::Write, DEFAULT_LEASE_DURATION, now())
            .unwrap();

        let result = mgr.acquire(
            &[free.clone(), held.clone()],
            TaskId::new(),
            WorkerId::new(),
            LockMode::Write,
            DEFAULT_LEASE_DURATION,
            now(),
        );
        assert!(result.is_err());
        // `free` was not partially granted.
        let second_free = mgr.acquire(&[free], TaskId::new(), WorkerId::new(), LockMode::Write, DEFAULT_LEASE_DURATION, now());
        assert!(second_free.is_ok());
    }

    #[test]
    fn release_is_idempotent() {
        let mgr = LockManager::new();
        let task = TaskId::new();
        let paths = vec![PathBuf::from("a.rs")];
        mgr.acquire(&paths, task, WorkerId::new(), LockMode::Write, DEFAULT_LEASE_DURATION, now())
            .unwrap();
        mgr.release(&paths, task);
        mgr.release(&paths, task);
        assert_eq!(mgr.locked_path_count(), 0);
    }

    #[test]
    fn release_only_removes_matching_task() {
        let mgr = LockManager::new();
        let path = PathBuf::from("a.rs");
        let owner = TaskId::new();
        mgr.acquire(&[path.clone()], owner, WorkerId::new(), LockMode::Write, DEFAULT_LEASE_DURATION, now())
            .unwrap();
        mgr.release(&[path.clone()], TaskId::new());
        assert_eq!(mgr.locked_path_count(), 1);
    }

    #[test]
    fn sweep_removes_expired_and_reports_them() {
        let mgr = LockManager::new();
        let path = PathBuf::from("a.rs");
        mgr.acquire(&[path.clone()], TaskId::new(), WorkerId::new(), LockMode::Write, Duration::from_secs(1), now())
            .unwrap();

        let later = now() + chrono::Duration::seconds(2);
        let expired = mgr.sweep(later);
        assert_eq!(expired.len(), 1);
        assert_eq!(mgr.locked_path_count(), 0);
    }

    #[test]
    fn multiple_read_locks_coexist() {
        let mgr = LockManager::new();
        let path = PathBuf::from("a.rs");
        mgr.acquire(&[path.clone()], TaskId::new(), WorkerId::new(), LockMode::Read, DEFAULT_LEASE_DURATION, now())
            .unwrap();
        let second = mgr.acquire(&[path], TaskId::new(), WorkerId::new(), LockMode::Read, DEFAULT_LEASE_DURATION, now());
        assert!(second.is_ok());
    }
}
