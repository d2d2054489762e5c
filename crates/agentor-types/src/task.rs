//! Task and task-draft shapes, and the enums that classify them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{TaskId, WorkerId};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Status of a task in the global state machine (§4.6 of the spec).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Blocked,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Blocked => "blocked",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskStatus {
    type Err = TaskStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "blocked" => Ok(Self::Blocked),
            other => Err(TaskStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TaskStatus`] string.
#[derive(Debug, Clone)]
pub struct TaskStatusParseError(pub String);

impl fmt::Display for TaskStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task status: {:?}", self.0)
    }
}

impl std::error::Error for TaskStatusParseError {}

// ---------------------------------------------------------------------------

/// Kind of work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Code,
    Test,
    Docs,
    Review,
    Refactor,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Code => "code",
            Self::Test => "test",
            Self::Docs => "docs",
            Self::Review => "review",
            Self::Refactor => "refactor",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskType {
    type Err = TaskTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(Self::Code),
            "test" => Ok(Self::Test),
            "docs" => Ok(Self::Docs),
            "review" => Ok(Self::Review),
            "refactor" => Ok(Self::Refactor),
            other => Err(TaskTypeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TaskType`] string.
#[derive(Debug, Clone)]
pub struct TaskTypeParseError(pub String);

impl fmt::Display for TaskTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task type: {:?}", self.0)
    }
}

impl std::error::Error for TaskTypeParseError {}

// ---------------------------------------------------------------------------

/// Dispatch priority. Ordered so that `High > Medium > Low` under the
/// derived `Ord` impl (declaration order matters here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = PriorityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(PriorityParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Priority`] string.
#[derive(Debug, Clone)]
pub struct PriorityParseError(pub String);

impl fmt::Display for PriorityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid priority: {:?}", self.0)
    }
}

impl std::error::Error for PriorityParseError {}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

/// Caller-supplied fields for a new task: everything except identity and
/// the fields the scheduler owns (`status`, `created_at`, `updated_at`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDraft {
    pub task_type: TaskType,
    pub priority: Priority,
    pub description: String,
    #[serde(default)]
    pub dependencies: BTreeSet<TaskId>,
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    #[serde(default, with = "duration_millis_opt")]
    pub estimated_duration: Option<Duration>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// A task tracked by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub status: TaskStatus,
    pub assigned_worker: Option<WorkerId>,
    pub task_type: TaskType,
    pub priority: Priority,
    pub description: String,
    pub dependencies: BTreeSet<TaskId>,
    pub files: Vec<PathBuf>,
    pub context: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub estimated_duration: Option<Duration>,
    pub metadata: Option<serde_json::Value>,
    /// Number of attempts made so far (incremented on each retryable
    /// failure the Retry Engine absorbs).
    pub attempt: u32,
}

impl Task {
    /// Build a new, `Pending` task from a validated draft.
    pub fn from_draft(id: TaskId, draft: TaskDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status: TaskStatus::Pending,
            assigned_worker: None,
            task_type: draft.task_type,
            priority: draft.priority,
            description: draft.description,
            dependencies: draft.dependencies,
            files: draft.files,
            context: draft.context,
            created_at: now,
            updated_at: now,
            estimated_duration: draft.estimated_duration,
            metadata: draft.metadata,
            attempt: 0,
        }
    }

    /// A task is terminal once it has reached `Completed` or `Failed`
    /// (invariant iii in §3 of the spec).
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Failed)
    }
}

mod duration_millis_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, ser: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => ser.serialize_some(&(d.as_millis() as u64)),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Duration>, D::Error> {
        let millis: Option<u64> = Option::deserialize(de)?;
        Ok(millis.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_display_roundtrip() {
        let variants = [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Blocked,
        ];
        for v in &variants {
            let s = v.to_string();
            let parsed: TaskStatus = s.parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn task_status_invalid() {
        assert!("nope".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn task_type_display_roundtrip() {
        for v in [
            TaskType::Code,
            TaskType::Test,
            TaskType::Docs,
            TaskType::Review,
            TaskType::Refactor,
        ] {
            assert_eq!(v.to_string().parse::<TaskType>().unwrap(), v);
        }
    }

    #[test]
    fn priority_ordering_is_high_first() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn priority_display_roundtrip() {
        for v in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(v.to_string().parse::<Priority>().unwrap(), v);
        }
    }

    #[test]
    fn from_draft_starts_pending_with_zero_attempts() {
        let draft = TaskDraft {
            task_type: TaskType::Code,
            priority: Priority::Medium,
            description: "do a thing".into(),
            dependencies: BTreeSet::new(),
            files: vec![PathBuf::from("a.rs")],
            context: BTreeMap::new(),
            estimated_duration: None,
            metadata: None,
        };
        let task = Task::from_draft(TaskId::new(), draft, Utc::now());
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.attempt, 0);
        assert!(!task.is_terminal());
    }
}
