//! Stable audit actions emitted by application use-cases.

use serde::{Deserialize, Serialize};

/// Action identifiers recorded alongside every successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a user account is created.
    UserCreated,
    /// Emitted when a user account is updated.
    UserUpdated,
    /// Emitted when a user account is deleted.
    UserDeleted,
    /// Emitted when a user changes their own password.
    PasswordChanged,
    /// Emitted when a client is created.
    ClientCreated,
    /// Emitted when a client is updated.
    ClientUpdated,
    /// Emitted when a client is deleted.
    ClientDeleted,
    /// Emitted when a project is created.
    ProjectCreated,
    /// Emitted when a project is updated.
    ProjectUpdated,
    /// Emitted when a project is deleted.
    ProjectDeleted,
    /// Emitted when a task is created.
    TaskCreated,
    /// Emitted when a task is updated.
    TaskUpdated,
    /// Emitted when a task is deleted.
    TaskDeleted,
    /// Emitted when a subtask is created.
    SubtaskCreated,
    /// Emitted when a subtask is updated.
    SubtaskUpdated,
    /// Emitted when a subtask is deleted.
    SubtaskDeleted,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserCreated => "user.created",
            Self::UserUpdated => "user.updated",
            Self::UserDeleted => "user.deleted",
            Self::PasswordChanged => "user.password_changed",
            Self::ClientCreated => "client.created",
            Self::ClientUpdated => "client.updated",
            Self::ClientDeleted => "client.deleted",
            Self::ProjectCreated => "project.created",
            Self::ProjectUpdated => "project.updated",
            Self::ProjectDeleted => "project.deleted",
            Self::TaskCreated => "task.created",
            Self::TaskUpdated => "task.updated",
            Self::TaskDeleted => "task.deleted",
            Self::SubtaskCreated => "subtask.created",
            Self::SubtaskUpdated => "subtask.updated",
            Self::SubtaskDeleted => "subtask.deleted",
        }
    }
}
