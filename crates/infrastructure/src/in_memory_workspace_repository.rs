//! In-memory workspace repository implementation.
//!
//! One store backs every repository port so referential rules can be checked
//! under the same locks as the write: subtask assignees are re-validated
//! against the parent task at write time, client deletes are refused while
//! projects reference them, and project/task deletes cascade to children.
//!
//! Lock order is users, clients, projects, tasks, subtasks; every method
//! acquires in that order.

use std::collections::HashMap;

use async_trait::async_trait;
use crewplan_application::{
    ClientRepository, ProjectRepository, SubtaskRepository, TaskRepository, UserAccount,
    UserRepository,
};
use crewplan_core::{AppError, AppResult};
use crewplan_domain::{
    Client, ClientId, Project, ProjectId, Subtask, SubtaskId, Task, TaskId, User, UserId,
};
use tokio::sync::RwLock;

/// In-memory store implementing every workspace repository port.
#[derive(Debug, Default)]
pub struct InMemoryWorkspaceRepository {
    users: RwLock<HashMap<UserId, UserAccount>>,
    clients: RwLock<HashMap<ClientId, Client>>,
    projects: RwLock<HashMap<ProjectId, Project>>,
    tasks: RwLock<HashMap<TaskId, Task>>,
    subtasks: RwLock<HashMap<SubtaskId, Subtask>>,
}

impl InMemoryWorkspaceRepository {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryWorkspaceRepository {
    async fn insert(&self, account: UserAccount) -> AppResult<()> {
        let mut users = self.users.write().await;

        if users
            .values()
            .any(|stored| stored.user.email == account.user.email)
        {
            return Err(AppError::Conflict(format!(
                "a user with email '{}' already exists",
                account.user.email
            )));
        }

        users.insert(account.user.id, account);
        Ok(())
    }

    async fn update_profile(&self, user: User) -> AppResult<()> {
        let mut users = self.users.write().await;

        if users
            .values()
            .any(|stored| stored.user.id != user.id && stored.user.email == user.email)
        {
            return Err(AppError::Conflict(format!(
                "a user with email '{}' already exists",
                user.email
            )));
        }

        match users.get_mut(&user.id) {
            Some(account) => {
                account.user = user;
                Ok(())
            }
            None => Err(AppError::NotFound(format!("user '{}'", user.id))),
        }
    }

    async fn update_password(&self, user_id: UserId, password_hash: &str) -> AppResult<()> {
        let mut users = self.users.write().await;

        match users.get_mut(&user_id) {
            Some(account) => {
                account.password_hash = password_hash.to_owned();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("user '{user_id}'"))),
        }
    }

    async fn delete(&self, user_id: UserId) -> AppResult<()> {
        let mut users = self.users.write().await;
        let projects = self.projects.read().await;
        let mut tasks = self.tasks.write().await;
        let subtasks = self.subtasks.read().await;

        if !users.contains_key(&user_id) {
            return Err(AppError::NotFound(format!("user '{user_id}'")));
        }

        if projects.values().any(|project| project.manager_id == user_id) {
            return Err(AppError::Conflict(
                "user still manages projects and cannot be deleted".to_owned(),
            ));
        }

        if subtasks
            .values()
            .any(|subtask| subtask.assigned_to_id == user_id)
        {
            return Err(AppError::Conflict(
                "user still holds assigned subtasks and cannot be deleted".to_owned(),
            ));
        }

        for task in tasks.values_mut() {
            if let crewplan_domain::TaskAssignment::Members(members) = &mut task.assignment {
                members.remove(&user_id);
            }
        }

        users.remove(&user_id);
        Ok(())
    }

    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserAccount>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|account| account.user.email.as_str() == email)
            .cloned())
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        let users = self.users.read().await;

        let mut listed: Vec<User> = users.values().map(|account| account.user.clone()).collect();
        listed.sort_by(|left, right| left.name.as_str().cmp(right.name.as_str()));

        Ok(listed)
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.users.read().await.len())
    }
}

#[async_trait]
impl ClientRepository for InMemoryWorkspaceRepository {
    async fn insert(&self, client: Client) -> AppResult<()> {
        let mut clients = self.clients.write().await;

        if clients.values().any(|stored| stored.name == client.name) {
            return Err(AppError::Conflict(format!(
                "a client named '{}' already exists",
                client.name
            )));
        }

        clients.insert(client.id, client);
        Ok(())
    }

    async fn update(&self, client: Client) -> AppResult<()> {
        let mut clients = self.clients.write().await;

        if clients
            .values()
            .any(|stored| stored.id != client.id && stored.name == client.name)
        {
            return Err(AppError::Conflict(format!(
                "a client named '{}' already exists",
                client.name
            )));
        }

        match clients.get_mut(&client.id) {
            Some(stored) => {
                *stored = client;
                Ok(())
            }
            None => Err(AppError::NotFound(format!("client '{}'", client.id))),
        }
    }

    async fn delete(&self, client_id: ClientId) -> AppResult<()> {
        let mut clients = self.clients.write().await;
        let projects = self.projects.read().await;

        if !clients.contains_key(&client_id) {
            return Err(AppError::NotFound(format!("client '{client_id}'")));
        }

        if projects.values().any(|project| project.client_id == client_id) {
            return Err(AppError::Conflict(
                "client still has projects and cannot be deleted".to_owned(),
            ));
        }

        clients.remove(&client_id);
        Ok(())
    }

    async fn find_by_id(&self, client_id: ClientId) -> AppResult<Option<Client>> {
        Ok(self.clients.read().await.get(&client_id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Client>> {
        let clients = self.clients.read().await;

        let mut listed: Vec<Client> = clients.values().cloned().collect();
        listed.sort_by(|left, right| left.name.as_str().cmp(right.name.as_str()));

        Ok(listed)
    }
}

#[async_trait]
impl ProjectRepository for InMemoryWorkspaceRepository {
    async fn insert(&self, project: Project) -> AppResult<()> {
        let users = self.users.read().await;
        let clients = self.clients.read().await;
        let mut projects = self.projects.write().await;

        if !clients.contains_key(&project.client_id) {
            return Err(AppError::Validation(format!(
                "client '{}' does not exist",
                project.client_id
            )));
        }

        if !users.contains_key(&project.manager_id) {
            return Err(AppError::Validation(format!(
                "manager '{}' does not exist",
                project.manager_id
            )));
        }

        projects.insert(project.id, project);
        Ok(())
    }

    async fn update(&self, project: Project) -> AppResult<()> {
        let users = self.users.read().await;
        let clients = self.clients.read().await;
        let mut projects = self.projects.write().await;

        if !clients.contains_key(&project.client_id) {
            return Err(AppError::Validation(format!(
                "client '{}' does not exist",
                project.client_id
            )));
        }

        if !users.contains_key(&project.manager_id) {
            return Err(AppError::Validation(format!(
                "manager '{}' does not exist",
                project.manager_id
            )));
        }

        match projects.get_mut(&project.id) {
            Some(stored) => {
                *stored = project;
                Ok(())
            }
            None => Err(AppError::NotFound(format!("project '{}'", project.id))),
        }
    }

    async fn delete(&self, project_id: ProjectId) -> AppResult<()> {
        let mut projects = self.projects.write().await;
        let mut tasks = self.tasks.write().await;
        let mut subtasks = self.subtasks.write().await;

        if projects.remove(&project_id).is_none() {
            return Err(AppError::NotFound(format!("project '{project_id}'")));
        }

        let removed_tasks: Vec<TaskId> = tasks
            .values()
            .filter(|task| task.project_id == project_id)
            .map(|task| task.id)
            .collect();

        tasks.retain(|_, task| task.project_id != project_id);
        subtasks.retain(|_, subtask| !removed_tasks.contains(&subtask.task_id));

        Ok(())
    }

    async fn find_by_id(&self, project_id: ProjectId) -> AppResult<Option<Project>> {
        Ok(self.projects.read().await.get(&project_id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Project>> {
        let projects = self.projects.read().await;

        let mut listed: Vec<Project> = projects.values().cloned().collect();
        listed.sort_by(|left, right| left.name.as_str().cmp(right.name.as_str()));

        Ok(listed)
    }
}

#[async_trait]
impl TaskRepository for InMemoryWorkspaceRepository {
    async fn insert(&self, task: Task) -> AppResult<()> {
        let users = self.users.read().await;
        let projects = self.projects.read().await;
        let mut tasks = self.tasks.write().await;

        if !projects.contains_key(&task.project_id) {
            return Err(AppError::Validation(format!(
                "project '{}' does not exist",
                task.project_id
            )));
        }

        for member_id in task.assignment.assignable_ids() {
            if !users.contains_key(&member_id) {
                return Err(AppError::Validation(format!(
                    "task member '{member_id}' does not exist"
                )));
            }
        }

        tasks.insert(task.id, task);
        Ok(())
    }

    async fn update(&self, task: Task) -> AppResult<()> {
        let users = self.users.read().await;
        let mut tasks = self.tasks.write().await;

        for member_id in task.assignment.assignable_ids() {
            if !users.contains_key(&member_id) {
                return Err(AppError::Validation(format!(
                    "task member '{member_id}' does not exist"
                )));
            }
        }

        match tasks.get_mut(&task.id) {
            Some(stored) => {
                *stored = task;
                Ok(())
            }
            None => Err(AppError::NotFound(format!("task '{}'", task.id))),
        }
    }

    async fn delete(&self, task_id: TaskId) -> AppResult<()> {
        let mut tasks = self.tasks.write().await;
        let mut subtasks = self.subtasks.write().await;

        if tasks.remove(&task_id).is_none() {
            return Err(AppError::NotFound(format!("task '{task_id}'")));
        }

        subtasks.retain(|_, subtask| subtask.task_id != task_id);
        Ok(())
    }

    async fn find_by_id(&self, task_id: TaskId) -> AppResult<Option<Task>> {
        Ok(self.tasks.read().await.get(&task_id).cloned())
    }

    async fn list_for_project(&self, project_id: ProjectId) -> AppResult<Vec<Task>> {
        let tasks = self.tasks.read().await;

        let mut listed: Vec<Task> = tasks
            .values()
            .filter(|task| task.project_id == project_id)
            .cloned()
            .collect();
        listed.sort_by(|left, right| left.name.as_str().cmp(right.name.as_str()));

        Ok(listed)
    }

    async fn add_assignable(&self, task_id: TaskId, user_id: UserId) -> AppResult<()> {
        let users = self.users.read().await;
        let mut tasks = self.tasks.write().await;

        if !users.contains_key(&user_id) {
            return Err(AppError::Validation(format!(
                "user '{user_id}' does not exist"
            )));
        }

        match tasks.get_mut(&task_id) {
            Some(task) => {
                task.assignment.add(user_id);
                Ok(())
            }
            None => Err(AppError::NotFound(format!("task '{task_id}'"))),
        }
    }
}

#[async_trait]
impl SubtaskRepository for InMemoryWorkspaceRepository {
    async fn insert(&self, subtask: Subtask) -> AppResult<()> {
        let tasks = self.tasks.read().await;
        let mut subtasks = self.subtasks.write().await;

        let Some(parent) = tasks.get(&subtask.task_id) else {
            return Err(AppError::Validation(format!(
                "task '{}' does not exist",
                subtask.task_id
            )));
        };

        // The policy saw a snapshot that may be stale; the invariant is
        // re-checked here, under the same locks as the write.
        if !parent.assignment.is_assignable(subtask.assigned_to_id) {
            return Err(AppError::Validation(format!(
                "assignee '{}' is not assignable on task '{}'",
                subtask.assigned_to_id, subtask.task_id
            )));
        }

        subtasks.insert(subtask.id, subtask);
        Ok(())
    }

    async fn update(&self, subtask: Subtask) -> AppResult<()> {
        let tasks = self.tasks.read().await;
        let mut subtasks = self.subtasks.write().await;

        let Some(parent) = tasks.get(&subtask.task_id) else {
            return Err(AppError::Validation(format!(
                "task '{}' does not exist",
                subtask.task_id
            )));
        };

        if !parent.assignment.is_assignable(subtask.assigned_to_id) {
            return Err(AppError::Validation(format!(
                "assignee '{}' is not assignable on task '{}'",
                subtask.assigned_to_id, subtask.task_id
            )));
        }

        match subtasks.get_mut(&subtask.id) {
            Some(stored) => {
                *stored = subtask;
                Ok(())
            }
            None => Err(AppError::NotFound(format!("subtask '{}'", subtask.id))),
        }
    }

    async fn delete(&self, subtask_id: SubtaskId) -> AppResult<()> {
        let mut subtasks = self.subtasks.write().await;

        if subtasks.remove(&subtask_id).is_none() {
            return Err(AppError::NotFound(format!("subtask '{subtask_id}'")));
        }

        Ok(())
    }

    async fn find_by_id(&self, subtask_id: SubtaskId) -> AppResult<Option<Subtask>> {
        Ok(self.subtasks.read().await.get(&subtask_id).cloned())
    }

    async fn list_for_task(&self, task_id: TaskId) -> AppResult<Vec<Subtask>> {
        let subtasks = self.subtasks.read().await;

        let mut listed: Vec<Subtask> = subtasks
            .values()
            .filter(|subtask| subtask.task_id == task_id)
            .cloned()
            .collect();
        listed.sort_by(|left, right| left.name.as_str().cmp(right.name.as_str()));

        Ok(listed)
    }
}
