//! Application services and ports.
//!
//! Every service follows the same discipline: evaluate the authorization
//! policy against a snapshot read through a repository port, perform the
//! mutation only on an allow, then record an audit event. Actors arrive as
//! explicit arguments; nothing here reaches into ambient session state.

#![forbid(unsafe_code)]

mod access;
mod audit;
mod client_service;
mod dashboard_service;
mod project_service;
mod subtask_service;
mod task_service;
mod user_admin_service;

pub use access::{denial_to_error, ensure_allowed, ensure_authenticated};
pub use audit::{AuditEvent, AuditRepository};
pub use client_service::{ClientRepository, ClientService, CreateClientInput, UpdateClientInput};
pub use dashboard_service::DashboardService;
pub use project_service::{
    CreateProjectInput, ProjectRepository, ProjectService, UpdateProjectInput,
};
pub use subtask_service::{
    CreateSubtaskInput, SubtaskRepository, SubtaskService, UpdateSubtaskInput,
};
pub use task_service::{CreateTaskInput, TaskRepository, TaskService, UpdateTaskInput};
pub use user_admin_service::{
    CreateUserInput, PasswordHasher, UpdateUserInput, UserAccount, UserAdminService,
    UserRepository,
};
