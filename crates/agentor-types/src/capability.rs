//! Worker capability descriptors (§3, §4.3).

use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::path::Path;

use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::task::TaskType;

/// Static description of what a worker can do.
///
/// A worker *can handle* a task iff `task.task_type` is in `task_types`
/// and at least one of `task.files` matches a pattern in `file_patterns`
/// (an empty task file list always matches, since there is nothing to
/// constrain against).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub file_patterns: Vec<String>,
    pub task_types: BTreeSet<TaskType>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub frameworks: Vec<String>,
    pub max_concurrent_tasks: NonZeroUsize,
}

impl Capability {
    /// Returns `true` if this capability can handle a task of the given
    /// type touching the given files.
    pub fn can_handle<P: AsRef<Path>>(&self, task_type: TaskType, files: &[P]) -> bool {
        if !self.task_types.contains(&task_type) {
            return false;
        }
        if files.is_empty() {
            return true;
        }
        files.iter().any(|f| self.matches_any_pattern(f.as_ref()))
    }

    fn matches_any_pattern(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.file_patterns.iter().any(|pat| {
            Pattern::new(pat)
                .map(|p| p.matches(&path_str))
                .unwrap_or(false)
        })
    }
}
