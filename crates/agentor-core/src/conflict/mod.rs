//! Conflict detector: identifies file-level collisions among queued or
//! in-flight tasks (§4.5).

use std::path::{Path, PathBuf};

use agentor_types::TaskId;

/// The kind of collision between two tasks sharing a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Both tasks intend to modify the path.
    WriteWrite,
    /// One reads, one writes.
    ReadWrite,
    /// `b` depends on `a` and both touch the path -- not a race, reported
    /// for uniformity so callers don't special-case it.
    Dependency,
}

/// How the scheduler resolves a detected conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictStrategy {
    /// `b` waits for `a` to release its leases.
    #[default]
    Queue,
    /// Reserved for mergeable task kinds; no concrete semantics yet, so
    /// this behaves exactly like `Queue` (§9 Open Questions).
    Merge,
    /// Reject `b` outright at submission time.
    Abort,
}

/// A detected collision between two tasks over a shared path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub a: TaskId,
    pub b: TaskId,
    pub path: PathBuf,
    pub kind: ConflictKind,
}

/// A candidate task for conflict checking: its id, the paths it touches,
/// and whether `b` (the candidate) depends on it.
pub struct Candidate<'a> {
    pub task_id: TaskId,
    pub files: &'a [PathBuf],
}

/// Find every conflict between `candidate` and the tasks already
/// in-progress or queued ahead of it.
///
/// `depends_on` should return `true` when the first task id depends
/// (directly or transitively) on the second, so a same-path collision
/// that is actually a dependency edge is reported as `Dependency` rather
/// than `WriteWrite`/`ReadWrite`.
pub fn detect<'a>(
    candidate: &Candidate<'a>,
    others: impl IntoIterator<Item = &'a Candidate<'a>>,
    depends_on: impl Fn(TaskId, TaskId) -> bool,
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for other in others {
        if other.task_id == candidate.task_id {
            continue;
        }
        for path in candidate.files {
            if !other.files.iter().any(|p| p == path) {
                continue;
            }
            let kind = if depends_on(candidate.task_id, other.task_id) {
                ConflictKind::Dependency
            } else {
                ConflictKind::WriteWrite
            };
            conflicts.push(Conflict {
                a: other.task_id,
                b: candidate.task_id,
                path: path.clone(),
                kind,
            });
        }
    }
    conflicts
}

/// Whether any two path lists share a path at all, used by the scheduler
/// as a cheap pre-check before the fuller [`detect`] pass.
pub fn shares_any_path(a: &[PathBuf], b: &[PathBuf]) -> bool {
    a.iter().any(|p| b.iter().any(|q| same_path(p, q)))
}

fn same_path(a: &Path, b: &Path) -> bool {
    a == b
}
