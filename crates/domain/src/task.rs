//! Task domain types, including the versioned assignment model.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use crewplan_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ProjectId, UserId};

/// Unique identifier for a task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new random task identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a task identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Lifecycle status shared by tasks and subtasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started yet.
    Pending,
    /// Being worked on.
    InProgress,
    /// Finished.
    Completed,
    /// Paused.
    OnHold,
}

impl TaskStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::OnHold => "on_hold",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "on_hold" => Ok(Self::OnHold),
            _ => Err(AppError::Validation(format!(
                "unknown task status '{value}'"
            ))),
        }
    }
}

/// How workers are attached to a task.
///
/// Two revisions of this model exist in the wild: an older one where a task
/// carried at most one assignee, and the current one where a task holds a set
/// of members eligible for its subtasks. Both are kept as a tagged variant so
/// legacy rows stay readable; new writes use the member-set model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskAssignment {
    /// Legacy single-assignee model.
    Single(Option<UserId>),
    /// Current multi-member model.
    Members(BTreeSet<UserId>),
}

impl TaskAssignment {
    /// Creates an empty member set (the canonical model for new tasks).
    #[must_use]
    pub fn empty() -> Self {
        Self::Members(BTreeSet::new())
    }

    /// Returns whether the user may be assigned work under this task.
    #[must_use]
    pub fn is_assignable(&self, user_id: UserId) -> bool {
        match self {
            Self::Single(assigned) => *assigned == Some(user_id),
            Self::Members(members) => members.contains(&user_id),
        }
    }

    /// Returns every user assignable under this task, in stable order.
    #[must_use]
    pub fn assignable_ids(&self) -> Vec<UserId> {
        match self {
            Self::Single(assigned) => assigned.iter().copied().collect(),
            Self::Members(members) => members.iter().copied().collect(),
        }
    }

    /// Adds a user to the assignable set. A legacy single-assignee task is
    /// promoted to the member-set model, keeping its existing assignee.
    pub fn add(&mut self, user_id: UserId) {
        match self {
            Self::Members(members) => {
                members.insert(user_id);
            }
            Self::Single(assigned) => {
                let mut members: BTreeSet<UserId> = assigned.iter().copied().collect();
                members.insert(user_id);
                *self = Self::Members(members);
            }
        }
    }
}

impl FromIterator<UserId> for TaskAssignment {
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        Self::Members(iter.into_iter().collect())
    }
}

/// A unit of project work subdivided into subtasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Project this task belongs to.
    pub project_id: ProjectId,
    /// Task name.
    pub name: NonEmptyString,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Creating actor. Set once, never mutated.
    pub created_by_id: UserId,
    /// Who may be assigned work under this task.
    pub assignment: TaskAssignment,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Optional explanation for the current status.
    pub status_reason: Option<String>,
    /// Optional planned start.
    pub start_date: Option<DateTime<Utc>>,
    /// Optional planned end.
    pub end_date: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a pending task with validated name and the given member set.
    pub fn new(
        project_id: ProjectId,
        name: impl Into<String>,
        description: Option<String>,
        created_by_id: UserId,
        assignment: TaskAssignment,
    ) -> AppResult<Self> {
        Ok(Self {
            id: TaskId::new(),
            project_id,
            name: NonEmptyString::new(name)?,
            description: description.filter(|value| !value.trim().is_empty()),
            created_by_id,
            assignment,
            status: TaskStatus::Pending,
            status_reason: None,
            start_date: None,
            end_date: None,
        })
    }
}
