//! Project management ports and application service.
//!
//! Creation and manager reassignment follow the policy exactly: a manager
//! always ends up owning projects they create, and may only keep or take
//! over an existing project, never hand it to a third party.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crewplan_core::{AppError, AppResult, NonEmptyString};
use crewplan_domain::{
    AccessRequest, Actor, AuditAction, ClientId, Priority, Progress, Project, ProjectId,
    ProjectSnapshot, ProjectStatus, User, UserId, resolve_project_manager,
};

use crate::access::{ensure_allowed, ensure_authenticated};
use crate::user_admin_service::UserRepository;
use crate::{AuditEvent, AuditRepository};

/// Repository port for project persistence.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Stores a new project.
    async fn insert(&self, project: Project) -> AppResult<()>;

    /// Replaces an existing project record.
    async fn update(&self, project: Project) -> AppResult<()>;

    /// Deletes a project and everything under it.
    async fn delete(&self, project_id: ProjectId) -> AppResult<()>;

    /// Finds a project by its identifier.
    async fn find_by_id(&self, project_id: ProjectId) -> AppResult<Option<Project>>;

    /// Lists all projects, name order.
    async fn list(&self) -> AppResult<Vec<Project>>;
}

/// Parameters for creating a project.
#[derive(Debug, Clone)]
pub struct CreateProjectInput {
    /// Unique project name.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Client the project is delivered for.
    pub client_id: ClientId,
    /// Manager requested by the form; resolution is policy-driven.
    pub manager_id: Option<UserId>,
    /// Optional planned start.
    pub start_date: Option<DateTime<Utc>>,
    /// Optional planned end.
    pub end_date: Option<DateTime<Utc>>,
    /// Delivery priority.
    pub priority: Priority,
}

/// Parameters for updating a project.
#[derive(Debug, Clone)]
pub struct UpdateProjectInput {
    /// Project to update.
    pub project_id: ProjectId,
    /// New project name.
    pub name: String,
    /// New description, if any.
    pub description: Option<String>,
    /// New client reference.
    pub client_id: ClientId,
    /// Manager the update records; reassignment is policy-gated.
    pub manager_id: UserId,
    /// New planned start.
    pub start_date: Option<DateTime<Utc>>,
    /// New planned end.
    pub end_date: Option<DateTime<Utc>>,
    /// New priority.
    pub priority: Priority,
    /// New lifecycle status.
    pub status: ProjectStatus,
    /// Optional explanation for the status.
    pub status_reason: Option<String>,
    /// New completion percentage; out-of-range input is clamped.
    pub progress: i64,
}

/// Application service for project CRUD and manager assignment.
#[derive(Clone)]
pub struct ProjectService {
    repository: Arc<dyn ProjectRepository>,
    user_repository: Arc<dyn UserRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl ProjectService {
    /// Creates a new project service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn ProjectRepository>,
        user_repository: Arc<dyn UserRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            repository,
            user_repository,
            audit_repository,
        }
    }

    /// Creates a project. The recorded manager follows the policy: managers
    /// own what they create, admins may name anyone.
    pub async fn create(
        &self,
        actor: Option<&Actor>,
        input: CreateProjectInput,
    ) -> AppResult<Project> {
        let actor = ensure_allowed(
            actor,
            &AccessRequest::ProjectCreate {
                requested_manager_id: input.manager_id,
            },
        )?;

        let manager_id = resolve_project_manager(actor, input.manager_id);
        self.require_manager_role(manager_id).await?;

        let project = Project {
            id: ProjectId::new(),
            name: NonEmptyString::new(input.name)?,
            description: input.description.filter(|value| !value.trim().is_empty()),
            client_id: input.client_id,
            manager_id,
            created_by_id: actor.id,
            start_date: input.start_date,
            end_date: input.end_date,
            priority: input.priority,
            status: ProjectStatus::Active,
            status_reason: None,
            progress: Progress::ZERO,
        };

        self.repository.insert(project.clone()).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor_id: actor.id,
                action: AuditAction::ProjectCreated,
                resource_type: "project".to_owned(),
                resource_id: project.id.to_string(),
                detail: Some(format!("created project '{}'", project.name)),
            })
            .await?;

        Ok(project)
    }

    /// Updates a project against its persisted snapshot.
    pub async fn update(
        &self,
        actor: Option<&Actor>,
        input: UpdateProjectInput,
    ) -> AppResult<Project> {
        ensure_authenticated(actor)?;

        let existing = self
            .repository
            .find_by_id(input.project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("project '{}'", input.project_id)))?;

        let actor = ensure_allowed(
            actor,
            &AccessRequest::ProjectUpdate {
                project: ProjectSnapshot::from(&existing),
                new_manager_id: input.manager_id,
            },
        )?;

        let reassigned = input.manager_id != existing.manager_id;
        if reassigned {
            self.require_manager_role(input.manager_id).await?;
        }

        let updated = Project {
            id: existing.id,
            name: NonEmptyString::new(input.name)?,
            description: input.description.filter(|value| !value.trim().is_empty()),
            client_id: input.client_id,
            manager_id: input.manager_id,
            created_by_id: existing.created_by_id,
            start_date: input.start_date,
            end_date: input.end_date,
            priority: input.priority,
            status: input.status,
            status_reason: input.status_reason.filter(|value| !value.trim().is_empty()),
            progress: Progress::clamped(input.progress),
        };

        self.repository.update(updated.clone()).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor_id: actor.id,
                action: AuditAction::ProjectUpdated,
                resource_type: "project".to_owned(),
                resource_id: updated.id.to_string(),
                detail: reassigned.then(|| {
                    format!(
                        "manager reassigned from '{}' to '{}'",
                        existing.manager_id, updated.manager_id
                    )
                }),
            })
            .await?;

        Ok(updated)
    }

    /// Deletes a project and its tasks permanently. Deletion is terminal.
    pub async fn delete(&self, actor: Option<&Actor>, project_id: ProjectId) -> AppResult<()> {
        let actor = ensure_allowed(actor, &AccessRequest::ProjectDelete)?;

        let existing = self
            .repository
            .find_by_id(project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("project '{project_id}'")))?;

        self.repository.delete(project_id).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor_id: actor.id,
                action: AuditAction::ProjectDeleted,
                resource_type: "project".to_owned(),
                resource_id: project_id.to_string(),
                detail: Some(format!("deleted project '{}'", existing.name)),
            })
            .await?;

        Ok(())
    }

    /// Returns a project by id, if it exists.
    pub async fn get(
        &self,
        actor: Option<&Actor>,
        project_id: ProjectId,
    ) -> AppResult<Option<Project>> {
        ensure_authenticated(actor)?;
        self.repository.find_by_id(project_id).await
    }

    /// Lists all projects.
    pub async fn list(&self, actor: Option<&Actor>) -> AppResult<Vec<Project>> {
        ensure_authenticated(actor)?;
        self.repository.list().await
    }

    /// Lists the users eligible to manage a project, for the project form.
    /// Shares the project-creation gate.
    pub async fn list_managers(&self, actor: Option<&Actor>) -> AppResult<Vec<User>> {
        ensure_allowed(
            actor,
            &AccessRequest::ProjectCreate {
                requested_manager_id: None,
            },
        )?;

        let mut managers: Vec<User> = self
            .user_repository
            .list()
            .await?
            .into_iter()
            .filter(|user| user.role.is_manager_or_admin())
            .collect();
        managers.sort_by(|left, right| left.name.as_str().cmp(right.name.as_str()));

        Ok(managers)
    }

    async fn require_manager_role(&self, manager_id: UserId) -> AppResult<()> {
        let account = self
            .user_repository
            .find_by_id(manager_id)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!("project manager '{manager_id}' does not exist"))
            })?;

        if !account.user.role.is_manager_or_admin() {
            return Err(AppError::Validation(
                "the project manager must hold the manager or admin role".to_owned(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use crewplan_domain::{EmailAddress, Role};
    use tokio::sync::Mutex;

    use crate::user_admin_service::UserAccount;

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
    struct FakeProjectRepository {
        projects: Mutex<HashMap<ProjectId, Project>>,
    }

    #[async_trait]
    impl ProjectRepository for FakeProjectRepository {
        async fn insert(&self, project: Project) -> AppResult<()> {
            self.projects.lock().await.insert(project.id, project);
            Ok(())
        }

        async fn update(&self, project: Project) -> AppResult<()> {
            self.projects.lock().await.insert(project.id, project);
            Ok(())
        }

        async fn delete(&self, project_id: ProjectId) -> AppResult<()> {
            self.projects.lock().await.remove(&project_id);
            Ok(())
        }

        async fn find_by_id(&self, project_id: ProjectId) -> AppResult<Option<Project>> {
            Ok(self.projects.lock().await.get(&project_id).cloned())
        }

        async fn list(&self) -> AppResult<Vec<Project>> {
            Ok(self.projects.lock().await.values().cloned().collect())
        }
    }

    #[derive(Default)]
    struct FakeUserRepository {
        accounts: Mutex<HashMap<UserId, UserAccount>>,
    }

    impl FakeUserRepository {
        async fn seed(&self, id: UserId, role: Role) {
            let name = format!("user-{id}");
            let email = format!("{id}@example.com");
            let Ok(name) = NonEmptyString::new(name) else {
                return;
            };
            let Ok(email) = EmailAddress::new(email) else {
                return;
            };
            self.accounts.lock().await.insert(
                id,
                UserAccount {
                    user: crewplan_domain::User {
                        id,
                        name,
                        email,
                        role,
                    },
                    password_hash: String::new(),
                },
            );
        }
    }

    #[async_trait]
    impl UserRepository for FakeUserRepository {
        async fn insert(&self, account: UserAccount) -> AppResult<()> {
            self.accounts.lock().await.insert(account.user.id, account);
            Ok(())
        }

        async fn update_profile(&self, user: crewplan_domain::User) -> AppResult<()> {
            let mut accounts = self.accounts.lock().await;
            match accounts.get_mut(&user.id) {
                Some(account) => {
                    account.user = user;
                    Ok(())
                }
                None => Err(AppError::NotFound(format!("user '{}'", user.id))),
            }
        }

        async fn update_password(&self, _user_id: UserId, _password_hash: &str) -> AppResult<()> {
            Ok(())
        }

        async fn delete(&self, user_id: UserId) -> AppResult<()> {
            self.accounts.lock().await.remove(&user_id);
            Ok(())
        }

        async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserAccount>> {
            Ok(self.accounts.lock().await.get(&user_id).cloned())
        }

        async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
            Ok(self
                .accounts
                .lock()
                .await
                .values()
                .find(|account| account.user.email.as_str() == email)
                .cloned())
        }

        async fn list(&self) -> AppResult<Vec<crewplan_domain::User>> {
            Ok(self
                .accounts
                .lock()
                .await
                .values()
                .map(|account| account.user.clone())
                .collect())
        }

        async fn count(&self) -> AppResult<usize> {
            Ok(self.accounts.lock().await.len())
        }
    }

    struct Harness {
        service: ProjectService,
        projects: Arc<FakeProjectRepository>,
        users: Arc<FakeUserRepository>,
        audit: Arc<FakeAuditRepository>,
    }

    fn harness() -> Harness {
        let projects = Arc::new(FakeProjectRepository::default());
        let users = Arc::new(FakeUserRepository::default());
        let audit = Arc::new(FakeAuditRepository::default());
        Harness {
            service: ProjectService::new(projects.clone(), users.clone(), audit.clone()),
            projects,
            users,
            audit,
        }
    }

    fn create_input(manager_id: Option<UserId>) -> CreateProjectInput {
        CreateProjectInput {
            name: "Website relaunch".to_owned(),
            description: None,
            client_id: ClientId::new(),
            manager_id,
            start_date: None,
            end_date: None,
            priority: Priority::Medium,
        }
    }

    #[tokio::test]
    async fn manager_created_projects_are_forced_to_self() {
        let harness = harness();
        let actor = Actor::new(UserId::new(), Role::Manager);
        harness.users.seed(actor.id, Role::Manager).await;
        let other = UserId::new();
        harness.users.seed(other, Role::Manager).await;

        let created = harness
            .service
            .create(Some(&actor), create_input(Some(other)))
            .await;

        assert_eq!(created.map(|project| project.manager_id).ok(), Some(actor.id));
    }

    #[tokio::test]
    async fn admin_may_assign_any_manager_on_create() {
        let harness = harness();
        let actor = Actor::new(UserId::new(), Role::Admin);
        harness.users.seed(actor.id, Role::Admin).await;
        let other = UserId::new();
        harness.users.seed(other, Role::Manager).await;

        let created = harness
            .service
            .create(Some(&actor), create_input(Some(other)))
            .await;

        assert_eq!(created.map(|project| project.manager_id).ok(), Some(other));
    }

    #[tokio::test]
    async fn project_manager_must_hold_a_management_role() {
        let harness = harness();
        let actor = Actor::new(UserId::new(), Role::Admin);
        harness.users.seed(actor.id, Role::Admin).await;
        let employee = UserId::new();
        harness.users.seed(employee, Role::Employee).await;

        let created = harness
            .service
            .create(Some(&actor), create_input(Some(employee)))
            .await;

        assert!(matches!(created, Err(AppError::Validation(_))));
        assert!(harness.projects.projects.lock().await.is_empty());
    }

    #[tokio::test]
    async fn manager_cannot_hand_a_project_to_a_third_party() {
        let harness = harness();
        let owner = Actor::new(UserId::new(), Role::Manager);
        harness.users.seed(owner.id, Role::Manager).await;
        let third_party = UserId::new();
        harness.users.seed(third_party, Role::Manager).await;

        let created = harness
            .service
            .create(Some(&owner), create_input(None))
            .await;
        let Ok(project) = created else {
            panic!("project creation failed");
        };

        let update = UpdateProjectInput {
            project_id: project.id,
            name: "Website relaunch".to_owned(),
            description: None,
            client_id: project.client_id,
            manager_id: third_party,
            start_date: None,
            end_date: None,
            priority: Priority::High,
            status: ProjectStatus::Active,
            status_reason: None,
            progress: 10,
        };

        let result = harness.service.update(Some(&owner), update.clone()).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        // The same reassignment by an admin goes through and is audited.
        let admin = Actor::new(UserId::new(), Role::Admin);
        let result = harness.service.update(Some(&admin), update).await;
        assert_eq!(result.map(|updated| updated.manager_id).ok(), Some(third_party));

        let events = harness.audit.events.lock().await;
        let detail = events.last().and_then(|event| event.detail.clone());
        assert!(detail.is_some_and(|text| text.contains("manager reassigned")));
    }

    #[tokio::test]
    async fn update_clamps_progress() {
        let harness = harness();
        let owner = Actor::new(UserId::new(), Role::Manager);
        harness.users.seed(owner.id, Role::Manager).await;

        let created = harness
            .service
            .create(Some(&owner), create_input(None))
            .await;
        let Ok(project) = created else {
            panic!("project creation failed");
        };

        let result = harness
            .service
            .update(
                Some(&owner),
                UpdateProjectInput {
                    project_id: project.id,
                    name: "Website relaunch".to_owned(),
                    description: None,
                    client_id: project.client_id,
                    manager_id: owner.id,
                    start_date: None,
                    end_date: None,
                    priority: Priority::Medium,
                    status: ProjectStatus::Delayed,
                    status_reason: Some("waiting on content".to_owned()),
                    progress: 250,
                },
            )
            .await;

        assert_eq!(
            result.map(|updated| updated.progress).ok(),
            Some(Progress::DONE)
        );
    }

    #[tokio::test]
    async fn employees_cannot_create_projects() {
        let harness = harness();
        let actor = Actor::new(UserId::new(), Role::Employee);

        let created = harness
            .service
            .create(Some(&actor), create_input(None))
            .await;
        assert!(matches!(created, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn manager_picker_lists_management_roles_only() {
        let harness = harness();
        let actor = Actor::new(UserId::new(), Role::Manager);
        harness.users.seed(actor.id, Role::Manager).await;
        harness.users.seed(UserId::new(), Role::Admin).await;
        harness.users.seed(UserId::new(), Role::Employee).await;

        let managers = harness.service.list_managers(Some(&actor)).await;
        assert_eq!(managers.map(|users| users.len()).unwrap_or_default(), 2);
    }
}
