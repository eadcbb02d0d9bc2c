//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

// Pulled in to enable `rand_core/getrandom` (for `OsRng`) via feature unification;
// the crate is otherwise reached through `argon2::password_hash`.
use password_hash as _;

mod argon2_password_hasher;
mod console_audit_log;
mod in_memory_audit_log;
mod in_memory_workspace_repository;

pub use argon2_password_hasher::Argon2PasswordHasher;
pub use console_audit_log::ConsoleAuditLog;
pub use in_memory_audit_log::InMemoryAuditLog;
pub use in_memory_workspace_repository::InMemoryWorkspaceRepository;
