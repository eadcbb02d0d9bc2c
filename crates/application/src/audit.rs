//! Audit trail port shared by every mutating service.

use async_trait::async_trait;
use crewplan_core::AppResult;
use crewplan_domain::{AuditAction, UserId};

/// One recorded mutation, attributed to the acting user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Acting user.
    pub actor_id: UserId,
    /// Stable action identifier.
    pub action: AuditAction,
    /// Resource type label, e.g. `"project"`.
    pub resource_type: String,
    /// Identifier of the touched resource.
    pub resource_id: String,
    /// Optional human-readable detail.
    pub detail: Option<String>,
}

/// Repository port for appending audit events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends one event to the trail.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}
