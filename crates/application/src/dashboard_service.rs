//! Role-scoped workspace dashboard.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use crewplan_core::AppResult;
use crewplan_domain::{
    Actor, ClientStatus, DashboardSummary, ProjectOverviewItem, ProjectStatus, StatusCounts,
    time_status,
};

use crate::access::ensure_authenticated;
use crate::client_service::ClientRepository;
use crate::project_service::ProjectRepository;
use crate::user_admin_service::UserRepository;

/// How many unfinished projects the overview shows.
const OVERVIEW_LIMIT: usize = 3;

/// Application service assembling the dashboard summary.
///
/// Full KPI access is restricted to managers and admins; employees receive
/// the zeroed shape so every consumer handles one type.
#[derive(Clone)]
pub struct DashboardService {
    client_repository: Arc<dyn ClientRepository>,
    project_repository: Arc<dyn ProjectRepository>,
    user_repository: Arc<dyn UserRepository>,
}

impl DashboardService {
    /// Creates a new dashboard service.
    #[must_use]
    pub fn new(
        client_repository: Arc<dyn ClientRepository>,
        project_repository: Arc<dyn ProjectRepository>,
        user_repository: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            client_repository,
            project_repository,
            user_repository,
        }
    }

    /// Builds the summary as of now.
    pub async fn summary(&self, actor: Option<&Actor>) -> AppResult<DashboardSummary> {
        self.summary_at(actor, Utc::now()).await
    }

    /// Builds the summary against an explicit clock, for deterministic tests.
    pub async fn summary_at(
        &self,
        actor: Option<&Actor>,
        now: DateTime<Utc>,
    ) -> AppResult<DashboardSummary> {
        let actor = ensure_authenticated(actor)?;

        if !actor.role.is_manager_or_admin() {
            return Ok(DashboardSummary::default());
        }

        let clients = self.client_repository.list().await?;
        let projects = self.project_repository.list().await?;
        let total_users = self.user_repository.count().await?;

        let client_counts = StatusCounts {
            active: clients
                .iter()
                .filter(|client| client.status == ClientStatus::Active)
                .count(),
            on_hold: clients
                .iter()
                .filter(|client| client.status == ClientStatus::OnHold)
                .count(),
            total: clients.len(),
        };

        let project_counts = StatusCounts {
            active: projects
                .iter()
                .filter(|project| project.status.is_running())
                .count(),
            on_hold: projects
                .iter()
                .filter(|project| project.status == ProjectStatus::OnHold)
                .count(),
            total: projects.len(),
        };

        let mut unfinished: Vec<_> = projects
            .into_iter()
            .filter(|project| !project.progress.is_complete())
            .collect();
        // Closest deadline first; projects without one sort last.
        unfinished.sort_by_key(|project| (project.end_date.is_none(), project.end_date));

        let overview = unfinished
            .into_iter()
            .take(OVERVIEW_LIMIT)
            .map(|project| ProjectOverviewItem {
                name: project.name.to_string(),
                progress: project.progress,
                time_status: time_status(project.end_date, project.progress, now),
            })
            .collect();

        Ok(DashboardSummary {
            clients: client_counts,
            projects: project_counts,
            total_users,
            overview,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use crewplan_core::{AppError, NonEmptyString};
    use crewplan_domain::{
        Client, ClientId, Priority, Progress, Project, ProjectId, Role, TimeStatus, User, UserId,
    };
    use tokio::sync::Mutex;

    use crate::user_admin_service::UserAccount;

    use super::*;

    #[derive(Default)]
    struct FakeClientRepository {
        clients: Mutex<Vec<Client>>,
    }

    #[async_trait]
    impl ClientRepository for FakeClientRepository {
        async fn insert(&self, client: Client) -> AppResult<()> {
            self.clients.lock().await.push(client);
            Ok(())
        }

        async fn update(&self, _client: Client) -> AppResult<()> {
            Ok(())
        }

        async fn delete(&self, _client_id: ClientId) -> AppResult<()> {
            Ok(())
        }

        async fn find_by_id(&self, _client_id: ClientId) -> AppResult<Option<Client>> {
            Ok(None)
        }

        async fn list(&self) -> AppResult<Vec<Client>> {
            Ok(self.clients.lock().await.clone())
        }
    }

    #[derive(Default)]
    struct FakeProjectRepository {
        projects: Mutex<Vec<Project>>,
    }

    #[async_trait]
    impl ProjectRepository for FakeProjectRepository {
        async fn insert(&self, project: Project) -> AppResult<()> {
            self.projects.lock().await.push(project);
            Ok(())
        }

        async fn update(&self, _project: Project) -> AppResult<()> {
            Ok(())
        }

        async fn delete(&self, _project_id: ProjectId) -> AppResult<()> {
            Ok(())
        }

        async fn find_by_id(&self, _project_id: ProjectId) -> AppResult<Option<Project>> {
            Ok(None)
        }

        async fn list(&self) -> AppResult<Vec<Project>> {
            Ok(self.projects.lock().await.clone())
        }
    }

    #[derive(Default)]
    struct FakeUserRepository {
        accounts: Mutex<HashMap<UserId, UserAccount>>,
    }

    #[async_trait]
    impl UserRepository for FakeUserRepository {
        async fn insert(&self, account: UserAccount) -> AppResult<()> {
            self.accounts.lock().await.insert(account.user.id, account);
            Ok(())
        }

        async fn update_profile(&self, _user: User) -> AppResult<()> {
            Ok(())
        }

        async fn update_password(&self, _user_id: UserId, _password_hash: &str) -> AppResult<()> {
            Ok(())
        }

        async fn delete(&self, _user_id: UserId) -> AppResult<()> {
            Ok(())
        }

        async fn find_by_id(&self, _user_id: UserId) -> AppResult<Option<UserAccount>> {
            Ok(None)
        }

        async fn find_by_email(&self, _email: &str) -> AppResult<Option<UserAccount>> {
            Ok(None)
        }

        async fn list(&self) -> AppResult<Vec<User>> {
            Ok(Vec::new())
        }

        async fn count(&self) -> AppResult<usize> {
            Ok(self.accounts.lock().await.len())
        }
    }

    fn project(name: &str, status: ProjectStatus, progress: i64, end_ts: Option<i64>) -> Project {
        Project {
            id: ProjectId::new(),
            name: NonEmptyString::new(name).unwrap_or_else(|_| panic!("valid name")),
            description: None,
            client_id: ClientId::new(),
            manager_id: UserId::new(),
            created_by_id: UserId::new(),
            start_date: None,
            end_date: end_ts.and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
            priority: Priority::Medium,
            status,
            status_reason: None,
            progress: Progress::clamped(progress),
        }
    }

    fn client(status: crewplan_domain::ClientStatus) -> Client {
        Client {
            id: ClientId::new(),
            name: NonEmptyString::new(ClientId::new().to_string())
                .unwrap_or_else(|_| panic!("valid name")),
            contact_email: None,
            phone: None,
            status,
        }
    }

    struct Harness {
        service: DashboardService,
        clients: Arc<FakeClientRepository>,
        projects: Arc<FakeProjectRepository>,
    }

    fn harness() -> Harness {
        let clients = Arc::new(FakeClientRepository::default());
        let projects = Arc::new(FakeProjectRepository::default());
        let users = Arc::new(FakeUserRepository::default());
        Harness {
            service: DashboardService::new(clients.clone(), projects.clone(), users),
            clients,
            projects,
        }
    }

    #[tokio::test]
    async fn employees_receive_the_zeroed_shape() {
        let harness = harness();
        harness
            .clients
            .clients
            .lock()
            .await
            .push(client(crewplan_domain::ClientStatus::Active));

        let summary = harness
            .service
            .summary_at(
                Some(&Actor::new(UserId::new(), Role::Employee)),
                Utc.timestamp_opt(0, 0).single().unwrap_or_default(),
            )
            .await;

        assert_eq!(summary.ok(), Some(DashboardSummary::default()));
    }

    #[tokio::test]
    async fn anonymous_requests_are_unauthorized() {
        let harness = harness();
        let summary = harness.service.summary(None).await;
        assert!(matches!(summary, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn counts_follow_status_and_running_rules() {
        let harness = harness();
        {
            let mut clients = harness.clients.clients.lock().await;
            clients.push(client(crewplan_domain::ClientStatus::Active));
            clients.push(client(crewplan_domain::ClientStatus::OnHold));
            clients.push(client(crewplan_domain::ClientStatus::Inactive));
        }
        {
            let mut projects = harness.projects.projects.lock().await;
            projects.push(project("a", ProjectStatus::Active, 10, None));
            projects.push(project("b", ProjectStatus::Pending, 0, None));
            projects.push(project("c", ProjectStatus::Delayed, 50, None));
            projects.push(project("d", ProjectStatus::OnHold, 20, None));
            projects.push(project("e", ProjectStatus::Completed, 100, None));
        }

        let summary = harness
            .service
            .summary_at(
                Some(&Actor::new(UserId::new(), Role::Manager)),
                Utc.timestamp_opt(0, 0).single().unwrap_or_default(),
            )
            .await;

        let Ok(summary) = summary else {
            panic!("summary failed");
        };
        assert_eq!(summary.clients.active, 1);
        assert_eq!(summary.clients.on_hold, 1);
        assert_eq!(summary.clients.total, 3);
        assert_eq!(summary.projects.active, 3);
        assert_eq!(summary.projects.on_hold, 1);
        assert_eq!(summary.projects.total, 5);
    }

    #[tokio::test]
    async fn overview_lists_three_unfinished_projects_by_deadline() {
        let harness = harness();
        {
            let mut projects = harness.projects.projects.lock().await;
            projects.push(project("done", ProjectStatus::Completed, 100, Some(100)));
            projects.push(project("late", ProjectStatus::Delayed, 40, Some(0)));
            projects.push(project("soon", ProjectStatus::Active, 60, Some(86_400)));
            projects.push(project("later", ProjectStatus::Active, 10, Some(10 * 86_400)));
            projects.push(project("undated", ProjectStatus::Active, 5, None));
        }

        let summary = harness
            .service
            .summary_at(
                Some(&Actor::new(UserId::new(), Role::Admin)),
                Utc.timestamp_opt(2 * 86_400, 0).single().unwrap_or_default(),
            )
            .await;

        let Ok(summary) = summary else {
            panic!("summary failed");
        };
        let names: Vec<&str> = summary
            .overview
            .iter()
            .map(|item| item.name.as_str())
            .collect();
        assert_eq!(names, vec!["late", "soon", "later"]);
        assert_eq!(summary.overview[0].time_status, TimeStatus::Overdue(2));
        assert_eq!(summary.overview[1].time_status, TimeStatus::Overdue(1));
        assert_eq!(summary.overview[2].time_status, TimeStatus::Remaining(8));
    }
}
