use std::sync::Arc;

use tenantgate_core::{AppResult, OrganizationId};
use tenantgate_domain::{Organization, OrganizationPatch};
use tracing::info;

use crate::{OrganizationContextCache, OrganizationStore};

/// Commits permission-affecting mutations together with their version bump
/// and cache eviction.
#[derive(Clone)]
pub struct PermissionInvalidator {
    store: Arc<dyn OrganizationStore>,
    cache: Arc<dyn OrganizationContextCache>,
}

impl PermissionInvalidator {
    /// Creates an invalidator.
    #[must_use]
    pub fn new(store: Arc<dyn OrganizationStore>, cache: Arc<dyn OrganizationContextCache>) -> Self {
        Self { store, cache }
    }

    /// Applies the patches and a version increment as one atomic update,
    /// then evicts every cached context of the organization.
    ///
    /// Returns only after eviction so the next resolution in this process
    /// reads the committed state.
    pub async fn commit(
        &self,
        organization_id: OrganizationId,
        mut patches: Vec<OrganizationPatch>,
    ) -> AppResult<Organization> {
        patches.push(OrganizationPatch::IncrementPermissionsVersion);
        let organization = self
            .store
            .patch_organization(organization_id, &patches)
            .await?;

        let permissions_version = organization.permissions_version();
        self.cache
            .note_version(organization_id, permissions_version)
            .await?;
        let evicted = self.cache.invalidate_organization(organization_id).await?;

        info!(
            organization_id = %organization_id,
            permissions_version,
            patches = patches.len(),
            evicted,
            "committed permission change"
        );

        Ok(organization)
    }

    /// Evicts one actor's cached contexts without touching the store.
    pub async fn invalidate_actor(
        &self,
        actor_id: &str,
        organization_id: OrganizationId,
    ) -> AppResult<usize> {
        self.cache.invalidate_entry(actor_id, organization_id).await
    }
}
