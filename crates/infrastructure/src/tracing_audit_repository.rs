use async_trait::async_trait;
use tenantgate_application::{AuditEvent, AuditRepository};
use tenantgate_core::AppResult;
use tracing::info;

/// Audit repository that writes events to the log only.
///
/// Used with the in-memory store backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditRepository;

#[async_trait]
impl AuditRepository for TracingAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        info!(
            target: "tenantgate::audit",
            organization_id = %event.organization_id,
            subject = %event.subject,
            action = event.action.as_str(),
            resource_type = %event.resource_type,
            resource_id = %event.resource_id,
            detail = event.detail.as_deref().unwrap_or_default(),
            "audit event"
        );
        Ok(())
    }
}
