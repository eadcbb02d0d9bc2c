//! Task management ports and application service.
//!
//! Task mutation is a management concern; read visibility additionally
//! extends to employees who are members of the task.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crewplan_core::{AppError, AppResult, NonEmptyString};
use crewplan_domain::{
    AccessRequest, Actor, AuditAction, ProjectId, Role, Task, TaskAssignment, TaskId,
    TaskSnapshot, TaskStatus, User, UserId,
};

use crate::access::{ensure_allowed, ensure_authenticated};
use crate::user_admin_service::UserRepository;
use crate::{AuditEvent, AuditRepository};

/// Repository port for task persistence.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stores a new task.
    async fn insert(&self, task: Task) -> AppResult<()>;

    /// Replaces an existing task record.
    async fn update(&self, task: Task) -> AppResult<()>;

    /// Deletes a task and its subtasks.
    async fn delete(&self, task_id: TaskId) -> AppResult<()>;

    /// Finds a task by its identifier.
    async fn find_by_id(&self, task_id: TaskId) -> AppResult<Option<Task>>;

    /// Lists the tasks of one project, name order.
    async fn list_for_project(&self, project_id: ProjectId) -> AppResult<Vec<Task>>;

    /// Adds a user to a task's assignable set, promoting legacy
    /// single-assignee rows to the member-set model.
    async fn add_assignable(&self, task_id: TaskId, user_id: UserId) -> AppResult<()>;
}

/// Parameters for creating a task.
#[derive(Debug, Clone)]
pub struct CreateTaskInput {
    /// Project the task belongs to.
    pub project_id: ProjectId,
    /// Task name.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Users eligible for the task's subtasks.
    pub member_ids: BTreeSet<UserId>,
    /// Optional planned start.
    pub start_date: Option<DateTime<Utc>>,
    /// Optional planned end.
    pub end_date: Option<DateTime<Utc>>,
}

/// Parameters for updating a task.
#[derive(Debug, Clone)]
pub struct UpdateTaskInput {
    /// Task to update.
    pub task_id: TaskId,
    /// New task name.
    pub name: String,
    /// New description, if any.
    pub description: Option<String>,
    /// New member set. Updates always write the member-set model.
    pub member_ids: BTreeSet<UserId>,
    /// New lifecycle status.
    pub status: TaskStatus,
    /// Optional explanation for the status.
    pub status_reason: Option<String>,
    /// New planned start.
    pub start_date: Option<DateTime<Utc>>,
    /// New planned end.
    pub end_date: Option<DateTime<Utc>>,
}

/// Application service for task CRUD and membership.
#[derive(Clone)]
pub struct TaskService {
    repository: Arc<dyn TaskRepository>,
    user_repository: Arc<dyn UserRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl TaskService {
    /// Creates a new task service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn TaskRepository>,
        user_repository: Arc<dyn UserRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            repository,
            user_repository,
            audit_repository,
        }
    }

    /// Creates a task with the given member set.
    pub async fn create(&self, actor: Option<&Actor>, input: CreateTaskInput) -> AppResult<Task> {
        let actor = ensure_allowed(actor, &AccessRequest::TaskCreate)?;
        self.require_assignable_roles(&input.member_ids).await?;

        let mut task = Task::new(
            input.project_id,
            input.name,
            input.description,
            actor.id,
            TaskAssignment::Members(input.member_ids),
        )?;
        task.start_date = input.start_date;
        task.end_date = input.end_date;

        self.repository.insert(task.clone()).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor_id: actor.id,
                action: AuditAction::TaskCreated,
                resource_type: "task".to_owned(),
                resource_id: task.id.to_string(),
                detail: Some(format!("created task '{}'", task.name)),
            })
            .await?;

        Ok(task)
    }

    /// Updates a task. The member set is rewritten wholesale; legacy
    /// single-assignee rows are migrated to the member-set model here.
    pub async fn update(&self, actor: Option<&Actor>, input: UpdateTaskInput) -> AppResult<Task> {
        let actor = ensure_allowed(actor, &AccessRequest::TaskUpdate)?;

        let existing = self
            .repository
            .find_by_id(input.task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("task '{}'", input.task_id)))?;

        self.require_assignable_roles(&input.member_ids).await?;

        let updated = Task {
            id: existing.id,
            project_id: existing.project_id,
            name: NonEmptyString::new(input.name)?,
            description: input.description.filter(|value| !value.trim().is_empty()),
            created_by_id: existing.created_by_id,
            assignment: TaskAssignment::Members(input.member_ids),
            status: input.status,
            status_reason: input.status_reason.filter(|value| !value.trim().is_empty()),
            start_date: input.start_date,
            end_date: input.end_date,
        };

        self.repository.update(updated.clone()).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor_id: actor.id,
                action: AuditAction::TaskUpdated,
                resource_type: "task".to_owned(),
                resource_id: updated.id.to_string(),
                detail: None,
            })
            .await?;

        Ok(updated)
    }

    /// Deletes a task and its subtasks permanently. Deletion is terminal.
    pub async fn delete(&self, actor: Option<&Actor>, task_id: TaskId) -> AppResult<()> {
        let actor = ensure_allowed(actor, &AccessRequest::TaskDelete)?;

        let existing = self
            .repository
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("task '{task_id}'")))?;

        self.repository.delete(task_id).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor_id: actor.id,
                action: AuditAction::TaskDeleted,
                resource_type: "task".to_owned(),
                resource_id: task_id.to_string(),
                detail: Some(format!("deleted task '{}'", existing.name)),
            })
            .await?;

        Ok(())
    }

    /// Returns a task, enforcing read visibility: managers and admins see
    /// everything, employees only tasks they are members of.
    pub async fn get(&self, actor: Option<&Actor>, task_id: TaskId) -> AppResult<Task> {
        ensure_authenticated(actor)?;

        let task = self
            .repository
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("task '{task_id}'")))?;

        ensure_allowed(
            actor,
            &AccessRequest::TaskRead {
                task: TaskSnapshot::from(&task),
            },
        )?;

        Ok(task)
    }

    /// Lists a project's tasks, filtered down to the visible ones for
    /// employee actors.
    pub async fn list_for_project(
        &self,
        actor: Option<&Actor>,
        project_id: ProjectId,
    ) -> AppResult<Vec<Task>> {
        let actor = ensure_authenticated(actor)?;

        let mut tasks = self.repository.list_for_project(project_id).await?;
        if !actor.role.is_manager_or_admin() {
            tasks.retain(|task| task.assignment.is_assignable(actor.id));
        }

        Ok(tasks)
    }

    /// Lists users eligible for task membership (managers and employees),
    /// for the task form. Shares the task-mutation gate.
    pub async fn list_assignable_users(&self, actor: Option<&Actor>) -> AppResult<Vec<User>> {
        ensure_allowed(actor, &AccessRequest::TaskCreate)?;

        let mut users: Vec<User> = self
            .user_repository
            .list()
            .await?
            .into_iter()
            .filter(|user| user.role != Role::Admin)
            .collect();
        users.sort_by(|left, right| left.name.as_str().cmp(right.name.as_str()));

        Ok(users)
    }

    async fn require_assignable_roles(&self, member_ids: &BTreeSet<UserId>) -> AppResult<()> {
        for member_id in member_ids {
            let account = self
                .user_repository
                .find_by_id(*member_id)
                .await?
                .ok_or_else(|| {
                    AppError::Validation(format!("task member '{member_id}' does not exist"))
                })?;

            if account.user.role == Role::Admin {
                return Err(AppError::Validation(
                    "task members must hold the manager or employee role".to_owned(),
                ));
            }
        }

        Ok(())
    }
}
