//! Subtask domain types: the finest-grained unit an employee can own.

use chrono::{DateTime, Utc};
use crewplan_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{TaskId, TaskStatus, UserId};

/// Unique identifier for a subtask record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubtaskId(Uuid);

impl SubtaskId {
    /// Creates a new random subtask identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a subtask identifier from an existing UUID value.
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

impl Default for SubtaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubtaskId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A piece of task work owned by a single assignee.
///
/// The assignee must be assignable on the parent task; the persistence layer
/// re-validates that inside the same lock scope as every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    /// Unique subtask identifier.
    pub id: SubtaskId,
    /// Parent task.
    pub task_id: TaskId,
    /// Subtask name.
    pub name: NonEmptyString,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Optional due date.
    pub end_date: Option<DateTime<Utc>>,
    /// Creating actor. Set once, never mutated.
    pub created_by_id: UserId,
    /// Who handed the work out.
    pub assigned_by_id: UserId,
    /// Who the work belongs to.
    pub assigned_to_id: UserId,
}

impl Subtask {
    /// Creates a pending subtask with a validated name. The creating actor is
    /// recorded as both creator and assigner.
    pub fn new(
        task_id: TaskId,
        name: impl Into<String>,
        description: Option<String>,
        end_date: Option<DateTime<Utc>>,
        created_by_id: UserId,
        assigned_to_id: UserId,
    ) -> AppResult<Self> {
        Ok(Self {
            id: SubtaskId::new(),
            task_id,
            name: NonEmptyString::new(name)?,
            description: description.filter(|value| !value.trim().is_empty()),
            status: TaskStatus::Pending,
            end_date,
            created_by_id,
            assigned_by_id: created_by_id,
            assigned_to_id,
        })
    }
}
