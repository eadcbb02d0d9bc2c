//! Subtask management ports and application service.
//!
//! The policy is evaluated against a snapshot of the parent task; the
//! repository re-validates assignee eligibility inside the same lock scope
//! as the write, because the snapshot may be stale by then.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crewplan_core::{AppError, AppResult, NonEmptyString};
use crewplan_domain::{
    AccessRequest, Actor, AuditAction, Role, Subtask, SubtaskChanges, SubtaskId, SubtaskSnapshot,
    Task, TaskId, TaskSnapshot, TaskStatus, UserId,
};

use crate::access::{ensure_allowed, ensure_authenticated};
use crate::task_service::TaskRepository;
use crate::{AuditEvent, AuditRepository};

/// Repository port for subtask persistence.
#[async_trait]
pub trait SubtaskRepository: Send + Sync {
    /// Stores a new subtask, re-checking that the assignee is assignable on
    /// the parent task at write time.
    async fn insert(&self, subtask: Subtask) -> AppResult<()>;

    /// Replaces an existing subtask record, with the same write-time check.
    async fn update(&self, subtask: Subtask) -> AppResult<()>;

    /// Deletes a subtask.
    async fn delete(&self, subtask_id: SubtaskId) -> AppResult<()>;

    /// Finds a subtask by its identifier.
    async fn find_by_id(&self, subtask_id: SubtaskId) -> AppResult<Option<Subtask>>;

    /// Lists the subtasks of one task, name order.
    async fn list_for_task(&self, task_id: TaskId) -> AppResult<Vec<Subtask>>;
}

/// Parameters for creating a subtask.
#[derive(Debug, Clone)]
pub struct CreateSubtaskInput {
    /// Parent task.
    pub task_id: TaskId,
    /// Subtask name.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Optional due date.
    pub end_date: Option<DateTime<Utc>>,
    /// Who the work is assigned to.
    pub assigned_to_id: UserId,
}

/// Parameters for updating a subtask.
///
/// Status and description are the ordinary working fields; name, assignee,
/// and assigner are privileged and `None` leaves them untouched.
#[derive(Debug, Clone)]
pub struct UpdateSubtaskInput {
    /// Subtask to update.
    pub subtask_id: SubtaskId,
    /// New lifecycle status.
    pub status: TaskStatus,
    /// New description; `None` clears it.
    pub description: Option<String>,
    /// New name, when renaming.
    pub name: Option<String>,
    /// New assignee, when reassigning.
    pub assigned_to_id: Option<UserId>,
    /// New recorded assigner, when correcting it.
    pub assigned_by_id: Option<UserId>,
}

/// Application service for subtask CRUD.
#[derive(Clone)]
pub struct SubtaskService {
    repository: Arc<dyn SubtaskRepository>,
    task_repository: Arc<dyn TaskRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl SubtaskService {
    /// Creates a new subtask service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn SubtaskRepository>,
        task_repository: Arc<dyn TaskRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            repository,
            task_repository,
            audit_repository,
        }
    }

    /// Creates a subtask under a parent task. The creating actor is recorded
    /// as creator and assigner.
    pub async fn create(
        &self,
        actor: Option<&Actor>,
        input: CreateSubtaskInput,
    ) -> AppResult<Subtask> {
        ensure_authenticated(actor)?;
        let parent = self.load_parent(input.task_id).await?;

        let actor = ensure_allowed(
            actor,
            &AccessRequest::SubtaskCreate {
                parent: TaskSnapshot::from(&parent),
                assigned_to_id: input.assigned_to_id,
            },
        )?;

        // Only an admin can get here with an assignee outside the member
        // set; pull the assignee in so the write-time invariant still holds.
        self.ensure_assignable(actor, &parent, input.assigned_to_id)
            .await?;

        let subtask = Subtask::new(
            input.task_id,
            input.name,
            input.description,
            input.end_date,
            actor.id,
            input.assigned_to_id,
        )?;

        self.repository.insert(subtask.clone()).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor_id: actor.id,
                action: AuditAction::SubtaskCreated,
                resource_type: "subtask".to_owned(),
                resource_id: subtask.id.to_string(),
                detail: Some(format!(
                    "created subtask '{}' assigned to '{}'",
                    subtask.name, subtask.assigned_to_id
                )),
            })
            .await?;

        Ok(subtask)
    }

    /// Updates a subtask. Mutation intents are derived by diffing the input
    /// against the persisted record, so resubmitting an unchanged field does
    /// not require the privilege to change it.
    pub async fn update(
        &self,
        actor: Option<&Actor>,
        input: UpdateSubtaskInput,
    ) -> AppResult<Subtask> {
        ensure_authenticated(actor)?;

        let existing = self
            .repository
            .find_by_id(input.subtask_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("subtask '{}'", input.subtask_id)))?;
        let parent = self.load_parent(existing.task_id).await?;

        let changes = SubtaskChanges {
            rename: input
                .name
                .as_deref()
                .is_some_and(|name| name != existing.name.as_str()),
            reassign_to: input
                .assigned_to_id
                .filter(|target| *target != existing.assigned_to_id),
            reassign_by: input
                .assigned_by_id
                .is_some_and(|assigner| assigner != existing.assigned_by_id),
        };

        let actor = ensure_allowed(
            actor,
            &AccessRequest::SubtaskUpdate {
                parent: TaskSnapshot::from(&parent),
                subtask: SubtaskSnapshot::from(&existing),
                changes,
            },
        )?;

        if let Some(target) = changes.reassign_to {
            self.ensure_assignable(actor, &parent, target).await?;
        }

        let updated = Subtask {
            id: existing.id,
            task_id: existing.task_id,
            name: match input.name {
                Some(name) => NonEmptyString::new(name)?,
                None => existing.name,
            },
            description: input.description.filter(|value| !value.trim().is_empty()),
            status: input.status,
            end_date: existing.end_date,
            created_by_id: existing.created_by_id,
            assigned_by_id: input.assigned_by_id.unwrap_or(existing.assigned_by_id),
            assigned_to_id: input.assigned_to_id.unwrap_or(existing.assigned_to_id),
        };

        self.repository.update(updated.clone()).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor_id: actor.id,
                action: AuditAction::SubtaskUpdated,
                resource_type: "subtask".to_owned(),
                resource_id: updated.id.to_string(),
                detail: changes.reassign_to.map(|target| {
                    format!(
                        "reassigned from '{}' to '{target}'",
                        existing.assigned_to_id
                    )
                }),
            })
            .await?;

        Ok(updated)
    }

    /// Deletes a subtask permanently. Deletion is terminal.
    pub async fn delete(&self, actor: Option<&Actor>, subtask_id: SubtaskId) -> AppResult<()> {
        ensure_authenticated(actor)?;

        let existing = self
            .repository
            .find_by_id(subtask_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("subtask '{subtask_id}'")))?;

        let actor = ensure_allowed(
            actor,
            &AccessRequest::SubtaskDelete {
                subtask: SubtaskSnapshot::from(&existing),
            },
        )?;

        self.repository.delete(subtask_id).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor_id: actor.id,
                action: AuditAction::SubtaskDeleted,
                resource_type: "subtask".to_owned(),
                resource_id: subtask_id.to_string(),
                detail: Some(format!("deleted subtask '{}'", existing.name)),
            })
            .await?;

        Ok(())
    }

    /// Lists a task's subtasks, behind the task read-visibility gate.
    pub async fn list_for_task(
        &self,
        actor: Option<&Actor>,
        task_id: TaskId,
    ) -> AppResult<Vec<Subtask>> {
        ensure_authenticated(actor)?;
        let parent = self.load_parent(task_id).await?;

        ensure_allowed(
            actor,
            &AccessRequest::TaskRead {
                task: TaskSnapshot::from(&parent),
            },
        )?;

        self.repository.list_for_task(task_id).await
    }

    async fn load_parent(&self, task_id: TaskId) -> AppResult<Task> {
        self.task_repository
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("task '{task_id}'")))
    }

    async fn ensure_assignable(
        &self,
        actor: &Actor,
        parent: &Task,
        target: UserId,
    ) -> AppResult<()> {
        if parent.assignment.is_assignable(target) {
            return Ok(());
        }

        // Reachable only after an allow, i.e. for admins.
        debug_assert_eq!(actor.role, Role::Admin);
        self.task_repository.add_assignable(parent.id, target).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Arc;

    use async_trait::async_trait;
    use crewplan_domain::{ProjectId, TaskAssignment};
    use tokio::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct FakeAuditRepository {
        events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditRepository for FakeAuditRepository {
        async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
            self.events.lock().await.push(event);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeTaskRepository {
        tasks: Mutex<HashMap<TaskId, Task>>,
    }

    #[async_trait]
    impl TaskRepository for FakeTaskRepository {
        async fn insert(&self, task: Task) -> AppResult<()> {
            self.tasks.lock().await.insert(task.id, task);
            Ok(())
        }

        async fn update(&self, task: Task) -> AppResult<()> {
            self.tasks.lock().await.insert(task.id, task);
            Ok(())
        }

        async fn delete(&self, task_id: TaskId) -> AppResult<()> {
            self.tasks.lock().await.remove(&task_id);
            Ok(())
        }

        async fn find_by_id(&self, task_id: TaskId) -> AppResult<Option<Task>> {
            Ok(self.tasks.lock().await.get(&task_id).cloned())
        }

        async fn list_for_project(&self, project_id: ProjectId) -> AppResult<Vec<Task>> {
            Ok(self
                .tasks
                .lock()
                .await
                .values()
                .filter(|task| task.project_id == project_id)
                .cloned()
                .collect())
        }

        async fn add_assignable(&self, task_id: TaskId, user_id: UserId) -> AppResult<()> {
            let mut tasks = self.tasks.lock().await;
            match tasks.get_mut(&task_id) {
                Some(task) => {
                    task.assignment.add(user_id);
                    Ok(())
                }
                None => Err(AppError::NotFound(format!("task '{task_id}'"))),
            }
        }
    }

    #[derive(Default)]
    struct FakeSubtaskRepository {
        subtasks: Mutex<HashMap<SubtaskId, Subtask>>,
    }

    #[async_trait]
    impl SubtaskRepository for FakeSubtaskRepository {
        async fn insert(&self, subtask: Subtask) -> AppResult<()> {
            self.subtasks.lock().await.insert(subtask.id, subtask);
            Ok(())
        }

        async fn update(&self, subtask: Subtask) -> AppResult<()> {
            self.subtasks.lock().await.insert(subtask.id, subtask);
            Ok(())
        }

        async fn delete(&self, subtask_id: SubtaskId) -> AppResult<()> {
            self.subtasks.lock().await.remove(&subtask_id);
            Ok(())
        }

        async fn find_by_id(&self, subtask_id: SubtaskId) -> AppResult<Option<Subtask>> {
            Ok(self.subtasks.lock().await.get(&subtask_id).cloned())
        }

        async fn list_for_task(&self, task_id: TaskId) -> AppResult<Vec<Subtask>> {
            Ok(self
                .subtasks
                .lock()
                .await
                .values()
                .filter(|subtask| subtask.task_id == task_id)
                .cloned()
                .collect())
        }
    }

    struct Harness {
        service: SubtaskService,
        tasks: Arc<FakeTaskRepository>,
        audit: Arc<FakeAuditRepository>,
    }

    fn harness() -> Harness {
        let subtasks = Arc::new(FakeSubtaskRepository::default());
        let tasks = Arc::new(FakeTaskRepository::default());
        let audit = Arc::new(FakeAuditRepository::default());
        Harness {
            service: SubtaskService::new(subtasks, tasks.clone(), audit.clone()),
            tasks,
            audit,
        }
    }

    async fn seed_task(harness: &Harness, members: &[UserId]) -> TaskId {
        let task = Task {
            id: TaskId::new(),
            project_id: ProjectId::new(),
            name: NonEmptyString::new("Design review").unwrap_or_else(|_| {
                panic!("valid name");
            }),
            description: None,
            created_by_id: UserId::new(),
            assignment: TaskAssignment::Members(members.iter().copied().collect::<BTreeSet<_>>()),
            status: TaskStatus::Pending,
            status_reason: None,
            start_date: None,
            end_date: None,
        };
        let id = task.id;
        harness.tasks.tasks.lock().await.insert(id, task);
        id
    }

    fn create_input(task_id: TaskId, assigned_to_id: UserId) -> CreateSubtaskInput {
        CreateSubtaskInput {
            task_id,
            name: "Draft wireframes".to_owned(),
            description: None,
            end_date: None,
            assigned_to_id,
        }
    }

    #[tokio::test]
    async fn employee_member_creates_a_self_assigned_subtask() {
        let harness = harness();
        let actor = Actor::new(UserId::new(), Role::Employee);
        let task_id = seed_task(&harness, &[actor.id]).await;

        let created = harness
            .service
            .create(Some(&actor), create_input(task_id, actor.id))
            .await;

        assert!(created.is_ok_and(|subtask| {
            subtask.created_by_id == actor.id && subtask.assigned_by_id == actor.id
        }));
        assert_eq!(harness.audit.events.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn employee_cannot_assign_to_a_peer() {
        let harness = harness();
        let actor = Actor::new(UserId::new(), Role::Employee);
        let peer = UserId::new();
        let task_id = seed_task(&harness, &[actor.id, peer]).await;

        let created = harness
            .service
            .create(Some(&actor), create_input(task_id, peer))
            .await;

        assert!(matches!(created, Err(AppError::Forbidden(_))));
        assert!(harness.audit.events.lock().await.is_empty());
    }

    #[tokio::test]
    async fn manager_assignment_is_bounded_by_membership() {
        let harness = harness();
        let actor = Actor::new(UserId::new(), Role::Manager);
        let outsider = UserId::new();
        let task_id = seed_task(&harness, &[UserId::new()]).await;

        let created = harness
            .service
            .create(Some(&actor), create_input(task_id, outsider))
            .await;

        assert!(matches!(created, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn admin_assignment_pulls_the_assignee_into_the_task() {
        let harness = harness();
        let actor = Actor::new(UserId::new(), Role::Admin);
        let outsider = UserId::new();
        let task_id = seed_task(&harness, &[]).await;

        let created = harness
            .service
            .create(Some(&actor), create_input(task_id, outsider))
            .await;
        assert!(created.is_ok());

        let tasks = harness.tasks.tasks.lock().await;
        assert!(
            tasks
                .get(&task_id)
                .is_some_and(|task| task.assignment.is_assignable(outsider))
        );
    }

    #[tokio::test]
    async fn assignee_updates_status_without_rename_privileges() {
        let harness = harness();
        let manager = Actor::new(UserId::new(), Role::Manager);
        let worker = UserId::new();
        let task_id = seed_task(&harness, &[worker]).await;

        let created = harness
            .service
            .create(Some(&manager), create_input(task_id, worker))
            .await;
        let Ok(subtask) = created else {
            panic!("subtask creation failed");
        };

        let actor = Actor::new(worker, Role::Employee);

        // Resubmitting the unchanged name is not a rename.
        let status_update = harness
            .service
            .update(
                Some(&actor),
                UpdateSubtaskInput {
                    subtask_id: subtask.id,
                    status: TaskStatus::InProgress,
                    description: Some("halfway there".to_owned()),
                    name: Some(subtask.name.as_str().to_owned()),
                    assigned_to_id: None,
                    assigned_by_id: None,
                },
            )
            .await;
        assert!(status_update.is_ok_and(|updated| updated.status == TaskStatus::InProgress));

        let rename = harness
            .service
            .update(
                Some(&actor),
                UpdateSubtaskInput {
                    subtask_id: subtask.id,
                    status: TaskStatus::InProgress,
                    description: None,
                    name: Some("A different name".to_owned()),
                    assigned_to_id: None,
                    assigned_by_id: None,
                },
            )
            .await;
        assert!(matches!(rename, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn uninvolved_employee_cannot_update_or_delete() {
        let harness = harness();
        let manager = Actor::new(UserId::new(), Role::Manager);
        let worker = UserId::new();
        let task_id = seed_task(&harness, &[worker]).await;

        let created = harness
            .service
            .create(Some(&manager), create_input(task_id, worker))
            .await;
        let Ok(subtask) = created else {
            panic!("subtask creation failed");
        };

        let outsider = Actor::new(UserId::new(), Role::Employee);

        let updated = harness
            .service
            .update(
                Some(&outsider),
                UpdateSubtaskInput {
                    subtask_id: subtask.id,
                    status: TaskStatus::Completed,
                    description: None,
                    name: None,
                    assigned_to_id: None,
                    assigned_by_id: None,
                },
            )
            .await;
        assert!(matches!(updated, Err(AppError::Forbidden(_))));

        let deleted = harness.service.delete(Some(&outsider), subtask.id).await;
        assert!(matches!(deleted, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn manager_deletes_other_peoples_subtasks() {
        let harness = harness();
        let creator = Actor::new(UserId::new(), Role::Employee);
        let task_id = seed_task(&harness, &[creator.id]).await;

        let created = harness
            .service
            .create(Some(&creator), create_input(task_id, creator.id))
            .await;
        let Ok(subtask) = created else {
            panic!("subtask creation failed");
        };

        // Manager is neither creator nor assignee; role carries the delete.
        let manager = Actor::new(UserId::new(), Role::Manager);
        let deleted = harness.service.delete(Some(&manager), subtask.id).await;
        assert!(deleted.is_ok());
    }

    #[tokio::test]
    async fn subtask_listing_is_visibility_gated() {
        let harness = harness();
        let member = UserId::new();
        let task_id = seed_task(&harness, &[member]).await;

        let manager = Actor::new(UserId::new(), Role::Manager);
        let created = harness
            .service
            .create(Some(&manager), create_input(task_id, member))
            .await;
        assert!(created.is_ok());

        let as_member = harness
            .service
            .list_for_task(Some(&Actor::new(member, Role::Employee)), task_id)
            .await;
        assert_eq!(as_member.map(|list| list.len()).unwrap_or_default(), 1);

        let outsider = Actor::new(UserId::new(), Role::Employee);
        let as_outsider = harness.service.list_for_task(Some(&outsider), task_id).await;
        assert!(matches!(as_outsider, Err(AppError::Forbidden(_))));
    }
}
