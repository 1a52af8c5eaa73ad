use std::sync::Arc;

use tenantgate_core::AppResult;
use tracing::{info, warn};

use crate::{OrganizationStore, TemporaryGrantService};

/// Outcome of one sweep across every organization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Organizations visited.
    pub organizations: usize,
    /// Expired grants removed in total.
    pub removed: usize,
    /// Organizations whose cleanup failed.
    pub failures: usize,
}

/// Periodic purge of expired temporary grants.
///
/// Expired grants never count toward permissions, so the sweep only keeps
/// documents small.
#[derive(Clone)]
pub struct GrantSweeper {
    store: Arc<dyn OrganizationStore>,
    grants: TemporaryGrantService,
}

impl GrantSweeper {
    /// Creates a sweeper.
    #[must_use]
    pub fn new(store: Arc<dyn OrganizationStore>, grants: TemporaryGrantService) -> Self {
        Self { store, grants }
    }

    /// Cleans up every organization. A failing organization does not stop the sweep.
    pub async fn sweep_all(&self) -> AppResult<SweepSummary> {
        let organization_ids = self.store.list_organization_ids().await?;
        let mut summary = SweepSummary {
            organizations: organization_ids.len(),
            ..SweepSummary::default()
        };

        for organization_id in organization_ids {
            match self.grants.cleanup_expired(organization_id).await {
                Ok(removed) => summary.removed += removed,
                Err(error) => {
                    summary.failures += 1;
                    warn!(
                        organization_id = %organization_id,
                        error = %error,
                        "expired grant cleanup failed"
                    );
                }
            }
        }

        info!(
            organizations = summary.organizations,
            removed = summary.removed,
            failures = summary.failures,
            "grant sweep finished"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tenantgate_core::{AppResult, Clock, UserId};
    use tenantgate_domain::{Permission, PermissionSet};

    use super::{GrantSweeper, SweepSummary};
    use crate::CreateTemporaryGrantInput;
    use crate::test_support::Harness;

    #[tokio::test]
    async fn sweep_visits_every_organization() -> AppResult<()> {
        let harness = Harness::new().await?;
        harness
            .role_admin()
            .provision_organization(UserId::new("founder")?, "globex", "Globex")
            .await?;
        let owner = harness.context_for("owner").await?;
        harness
            .grants()
            .grant(
                &owner,
                CreateTemporaryGrantInput {
                    user_id: UserId::new("viewer")?,
                    permissions: PermissionSet::from([Permission::ManageForms]),
                    expires_at: harness.clock.now() + Duration::minutes(1),
                    reason: None,
                },
            )
            .await?;
        harness.clock.advance(Duration::minutes(2));

        let sweeper = GrantSweeper::new(harness.store.clone(), harness.grants());
        let summary = sweeper.sweep_all().await?;

        assert_eq!(
            summary,
            SweepSummary {
                organizations: 2,
                removed: 1,
                failures: 0,
            }
        );
        assert_eq!(sweeper.sweep_all().await?.removed, 0);
        Ok(())
    }
}
