//! Role-based authorization policy.
//!
//! One pure decision function maps `(actor, request)` to [`Decision`].
//! Callers read the relevant entity state first, evaluate, and perform the
//! mutation only on [`Decision::Allow`]. The function has no side effects and
//! never fails: malformed or mismatched input is a denial, not an error, so
//! identical inputs always produce identical output.
//!
//! Three facts drive every rule:
//! - role privilege is monotonic (`Employee < Manager < Admin`),
//! - ownership (creator/assignee) is only consulted for employees,
//! - admins bypass task-membership restrictions that bind managers.

use serde::{Deserialize, Serialize};

use crate::{Project, ProjectId, Role, Subtask, SubtaskId, Task, TaskAssignment, TaskId, UserId};

/// The authenticated party attempting an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable user identifier from the session provider.
    pub id: UserId,
    /// Workspace role at request time.
    pub role: Role,
}

impl Actor {
    /// Creates an actor from session identity data.
    #[must_use]
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}

/// Persisted project fields the policy consults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSnapshot {
    /// Project identifier.
    pub id: ProjectId,
    /// Currently accountable manager.
    pub manager_id: UserId,
}

/// Persisted task fields the policy consults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    /// Task identifier.
    pub id: TaskId,
    /// Who may be assigned work under the task.
    pub assignment: TaskAssignment,
}

/// Persisted subtask fields the policy consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtaskSnapshot {
    /// Subtask identifier.
    pub id: SubtaskId,
    /// Parent task identifier.
    pub task_id: TaskId,
    /// Creating actor.
    pub created_by_id: UserId,
    /// Current assignee.
    pub assigned_to_id: UserId,
    /// Who handed the work out.
    pub assigned_by_id: UserId,
}

impl From<&Project> for ProjectSnapshot {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id,
            manager_id: project.manager_id,
        }
    }
}

impl From<&Task> for TaskSnapshot {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            assignment: task.assignment.clone(),
        }
    }
}

impl From<&Subtask> for SubtaskSnapshot {
    fn from(subtask: &Subtask) -> Self {
        Self {
            id: subtask.id,
            task_id: subtask.task_id,
            created_by_id: subtask.created_by_id,
            assigned_to_id: subtask.assigned_to_id,
            assigned_by_id: subtask.assigned_by_id,
        }
    }
}

/// Field-level mutation intents for a subtask update.
///
/// `rename` and `reassign_to` are restricted to admins, managers, and the
/// original creator; `reassign_by` to managers and admins. Intents should be
/// derived by diffing the submitted form against the snapshot so that
/// submitting an unchanged value does not count as a mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubtaskChanges {
    /// The subtask name would change.
    pub rename: bool,
    /// The assignee would change to this user.
    pub reassign_to: Option<UserId>,
    /// The recorded assigner would change.
    pub reassign_by: bool,
}

/// One resource/action pair together with the snapshot it is judged against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRequest {
    /// Create a user account.
    UserCreate,
    /// Update a user account.
    UserUpdate,
    /// Delete a user account.
    UserDelete,
    /// Create a client.
    ClientCreate,
    /// Update a client.
    ClientUpdate,
    /// Delete a client.
    ClientDelete,
    /// Create a project, optionally naming a manager.
    ProjectCreate {
        /// Manager requested by the form, if any. See
        /// [`resolve_project_manager`] for how the effective value is chosen.
        requested_manager_id: Option<UserId>,
    },
    /// Update a project, possibly moving it to a new manager.
    ProjectUpdate {
        /// Persisted project state.
        project: ProjectSnapshot,
        /// Manager the update would record.
        new_manager_id: UserId,
    },
    /// Delete a project.
    ProjectDelete,
    /// Create a task.
    TaskCreate,
    /// Update a task.
    TaskUpdate,
    /// Delete a task.
    TaskDelete,
    /// Read a task and its subtasks.
    TaskRead {
        /// Persisted task state.
        task: TaskSnapshot,
    },
    /// Create a subtask under a parent task.
    SubtaskCreate {
        /// Persisted parent task state.
        parent: TaskSnapshot,
        /// Requested assignee.
        assigned_to_id: UserId,
    },
    /// Update a subtask.
    SubtaskUpdate {
        /// Persisted parent task state.
        parent: TaskSnapshot,
        /// Persisted subtask state.
        subtask: SubtaskSnapshot,
        /// Field-level mutation intents.
        changes: SubtaskChanges,
    },
    /// Delete a subtask.
    SubtaskDelete {
        /// Persisted subtask state.
        subtask: SubtaskSnapshot,
    },
}

/// Why a request was denied. Carried to the end user, never a bare boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// No session; checked before any resource rule.
    Unauthenticated,
    /// The actor's role is too low for the action.
    InsufficientRole,
    /// An employee acting on a resource they neither created nor own.
    NotOwner,
    /// The assignee is not assignable on the parent task.
    NotTaskMember,
    /// An employee may only assign new subtasks to themselves.
    SelfAssignOnly,
    /// A manager may not hand a project to a third party.
    CannotReassignManager,
    /// The request is malformed (e.g. snapshots that do not belong together).
    InvalidRequest,
}

impl DenialReason {
    /// Returns a stable token for logs and transport.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::InsufficientRole => "insufficient_role",
            Self::NotOwner => "not_owner",
            Self::NotTaskMember => "not_task_member",
            Self::SelfAssignOnly => "self_assign_only",
            Self::CannotReassignManager => "cannot_reassign_manager",
            Self::InvalidRequest => "invalid_request",
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::Unauthenticated => "you must be signed in to perform this action",
            Self::InsufficientRole => "your role does not permit this action",
            Self::NotOwner => "you are neither the creator nor the assignee of this item",
            Self::NotTaskMember => "the assignee is not a member of the parent task",
            Self::SelfAssignOnly => "employees may only assign subtasks to themselves",
            Self::CannotReassignManager => {
                "a manager may keep the current project manager or take the project over, \
                 but not hand it to someone else"
            }
            Self::InvalidRequest => "the request is malformed",
        };
        formatter.write_str(message)
    }
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The caller may perform the mutation or read.
    Allow,
    /// The caller must abort and surface the reason.
    Deny(DenialReason),
}

impl Decision {
    /// Returns whether the decision permits the action.
    #[must_use]
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Converts the decision into a result for `?`-style call sites.
    pub fn into_result(self) -> Result<(), DenialReason> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(reason),
        }
    }
}

/// Evaluates the policy for one request.
///
/// `actor` is `None` when the request carries no session; that denies before
/// any resource rule is consulted. Rules are ordered and the first match wins;
/// anything unmatched falls through to a denial.
#[must_use]
pub fn evaluate(actor: Option<&Actor>, request: &AccessRequest) -> Decision {
    let Some(actor) = actor else {
        return Decision::Deny(DenialReason::Unauthenticated);
    };

    match request {
        AccessRequest::UserCreate | AccessRequest::UserUpdate | AccessRequest::UserDelete => {
            require_role(actor, Role::Admin)
        }

        AccessRequest::ClientCreate
        | AccessRequest::ClientUpdate
        | AccessRequest::ClientDelete
        | AccessRequest::ProjectCreate { .. }
        | AccessRequest::ProjectDelete
        | AccessRequest::TaskCreate
        | AccessRequest::TaskUpdate
        | AccessRequest::TaskDelete => require_role(actor, Role::Manager),

        AccessRequest::ProjectUpdate {
            project,
            new_manager_id,
        } => project_update(actor, project, *new_manager_id),

        AccessRequest::TaskRead { task } => task_read(actor, task),

        AccessRequest::SubtaskCreate {
            parent,
            assigned_to_id,
        } => subtask_create(actor, parent, *assigned_to_id),

        AccessRequest::SubtaskUpdate {
            parent,
            subtask,
            changes,
        } => subtask_update(actor, parent, subtask, changes),

        AccessRequest::SubtaskDelete { subtask } => subtask_delete(actor, subtask),
    }
}

/// Resolves the manager recorded on a newly created project.
///
/// A manager always becomes the manager themselves, whatever the form said;
/// an admin may name anyone and defaults to self. Only meaningful after
/// [`evaluate`] allowed the corresponding [`AccessRequest::ProjectCreate`].
#[must_use]
pub fn resolve_project_manager(actor: &Actor, requested: Option<UserId>) -> UserId {
    match actor.role {
        Role::Manager => actor.id,
        Role::Admin | Role::Employee => requested.unwrap_or(actor.id),
    }
}

fn require_role(actor: &Actor, minimum: Role) -> Decision {
    if actor.role >= minimum {
        Decision::Allow
    } else {
        Decision::Deny(DenialReason::InsufficientRole)
    }
}

fn project_update(actor: &Actor, project: &ProjectSnapshot, new_manager_id: UserId) -> Decision {
    match actor.role {
        Role::Admin => Decision::Allow,
        Role::Manager => {
            if new_manager_id == project.manager_id || new_manager_id == actor.id {
                Decision::Allow
            } else {
                Decision::Deny(DenialReason::CannotReassignManager)
            }
        }
        Role::Employee => Decision::Deny(DenialReason::InsufficientRole),
    }
}

fn task_read(actor: &Actor, task: &TaskSnapshot) -> Decision {
    if actor.role.is_manager_or_admin() || task.assignment.is_assignable(actor.id) {
        Decision::Allow
    } else {
        Decision::Deny(DenialReason::NotTaskMember)
    }
}

fn subtask_create(actor: &Actor, parent: &TaskSnapshot, assigned_to_id: UserId) -> Decision {
    match actor.role {
        Role::Admin => Decision::Allow,
        Role::Manager => {
            if parent.assignment.is_assignable(assigned_to_id) {
                Decision::Allow
            } else {
                Decision::Deny(DenialReason::NotTaskMember)
            }
        }
        Role::Employee => {
            if assigned_to_id != actor.id {
                return Decision::Deny(DenialReason::SelfAssignOnly);
            }
            if parent.assignment.is_assignable(actor.id) {
                Decision::Allow
            } else {
                Decision::Deny(DenialReason::NotTaskMember)
            }
        }
    }
}

fn subtask_update(
    actor: &Actor,
    parent: &TaskSnapshot,
    subtask: &SubtaskSnapshot,
    changes: &SubtaskChanges,
) -> Decision {
    if subtask.task_id != parent.id {
        return Decision::Deny(DenialReason::InvalidRequest);
    }

    let is_creator = subtask.created_by_id == actor.id;
    let is_assignee = subtask.assigned_to_id == actor.id;

    if actor.role == Role::Employee && !is_creator && !is_assignee {
        return Decision::Deny(DenialReason::NotOwner);
    }

    if (changes.rename || changes.reassign_to.is_some())
        && !(actor.role.is_manager_or_admin() || is_creator)
    {
        return Decision::Deny(DenialReason::NotOwner);
    }

    if changes.reassign_by && !actor.role.is_manager_or_admin() {
        return Decision::Deny(DenialReason::InsufficientRole);
    }

    if let Some(target) = changes.reassign_to
        && actor.role != Role::Admin
        && !parent.assignment.is_assignable(target)
    {
        return Decision::Deny(DenialReason::NotTaskMember);
    }

    Decision::Allow
}

fn subtask_delete(actor: &Actor, subtask: &SubtaskSnapshot) -> Decision {
    if actor.role.is_manager_or_admin()
        || subtask.created_by_id == actor.id
        || subtask.assigned_to_id == actor.id
    {
        Decision::Allow
    } else {
        Decision::Deny(DenialReason::NotOwner)
    }
}
