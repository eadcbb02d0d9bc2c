//! Project domain types.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use crewplan_core::{AppError, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ClientId, UserId};

/// Unique identifier for a project record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(Uuid);

impl ProjectId {
    /// Creates a new random project identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a project identifier from an existing UUID value.
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

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Work is in progress.
    Active,
    /// Awaiting kickoff.
    Pending,
    /// Behind schedule.
    Delayed,
    /// Paused.
    OnHold,
    /// Finished.
    Completed,
    /// Abandoned before completion.
    Cancelled,
}

impl ProjectStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Delayed => "delayed",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns whether this status counts as running work for reporting.
    /// Pending and delayed projects still occupy the team.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Active | Self::Pending | Self::Delayed)
    }
}

impl FromStr for ProjectStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "pending" => Ok(Self::Pending),
            "delayed" => Ok(Self::Delayed),
            "on_hold" => Ok(Self::OnHold),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(AppError::Validation(format!(
                "unknown project status '{value}'"
            ))),
        }
    }
}

/// Delivery priority of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Can slip without consequence.
    Low,
    /// Default priority.
    Medium,
    /// Needs attention.
    High,
    /// Drop everything.
    Urgent,
}

impl Priority {
    /// Returns a stable storage value for this priority.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(AppError::Validation(format!("unknown priority '{value}'"))),
        }
    }
}

/// Completion percentage clamped to `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Progress(u8);

impl Progress {
    /// Zero percent complete.
    pub const ZERO: Self = Self(0);

    /// One hundred percent complete.
    pub const DONE: Self = Self(100);

    /// Creates a progress value, clamping out-of-range input into `0..=100`.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(0, 100) as u8)
    }

    /// Returns the percentage as an integer.
    #[must_use]
    pub fn percent(&self) -> u8 {
        self.0
    }

    /// Returns whether the work is fully complete.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.0 == 100
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::ZERO
    }
}

impl std::fmt::Display for Progress {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}%", self.0)
    }
}

/// A project run for a client. `manager_id` is the accountable owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique project identifier.
    pub id: ProjectId,
    /// Unique project name.
    pub name: NonEmptyString,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Client the project is delivered for.
    pub client_id: ClientId,
    /// Accountable manager. Reassignment is policy-gated.
    pub manager_id: UserId,
    /// Creating actor. Set once, never mutated.
    pub created_by_id: UserId,
    /// Optional planned start.
    pub start_date: Option<DateTime<Utc>>,
    /// Optional planned end.
    pub end_date: Option<DateTime<Utc>>,
    /// Delivery priority.
    pub priority: Priority,
    /// Lifecycle status.
    pub status: ProjectStatus,
    /// Optional explanation for the current status.
    pub status_reason: Option<String>,
    /// Completion percentage.
    pub progress: Progress,
}
