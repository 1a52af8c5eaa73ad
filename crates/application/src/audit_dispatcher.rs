use std::sync::Arc;

use tracing::warn;

use crate::{AuditEvent, AuditRepository};

/// Best-effort audit sink. Failures are logged and never reach the caller.
#[derive(Clone)]
pub struct AuditDispatcher {
    repository: Arc<dyn AuditRepository>,
}

impl AuditDispatcher {
    /// Creates a dispatcher over an audit repository.
    #[must_use]
    pub fn new(repository: Arc<dyn AuditRepository>) -> Self {
        Self { repository }
    }

    /// Records one event after the main mutation committed.
    pub async fn record(&self, event: AuditEvent) {
        let action = event.action.as_str();
        let organization_id = event.organization_id;
        if let Err(error) = self.repository.append_event(event).await {
            warn!(
                error = %error,
                action,
                organization_id = %organization_id,
                "failed to append audit event"
            );
        }
    }
}
