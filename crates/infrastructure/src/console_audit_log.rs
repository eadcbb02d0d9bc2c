//! Audit log adapter that emits structured tracing events.
//!
//! Suitable for development and for deployments that ship their audit trail
//! through the log pipeline rather than a dedicated table.

use async_trait::async_trait;
use crewplan_application::{AuditEvent, AuditRepository};
use crewplan_core::AppResult;
use tracing::info;

/// Audit repository writing each event to the `audit` tracing target.
#[derive(Clone, Default)]
pub struct ConsoleAuditLog;

impl ConsoleAuditLog {
    /// Creates a new console audit log.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditRepository for ConsoleAuditLog {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        info!(
            target: "audit",
            actor_id = %event.actor_id,
            action = event.action.as_str(),
            resource_type = %event.resource_type,
            resource_id = %event.resource_id,
            detail = event.detail.as_deref().unwrap_or(""),
            "audit event"
        );

        Ok(())
    }
}
