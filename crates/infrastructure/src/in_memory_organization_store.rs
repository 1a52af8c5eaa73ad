use std::collections::HashMap;

use async_trait::async_trait;
use tenantgate_application::OrganizationStore;
use tenantgate_core::{AppError, AppResult, OrganizationId, UserId};
use tenantgate_domain::{Organization, OrganizationPatch, TeamMember};
use tokio::sync::RwLock;

/// In-memory organization document store for local development and tests.
#[derive(Default)]
pub struct InMemoryOrganizationStore {
    organizations: RwLock<HashMap<OrganizationId, Organization>>,
}

impl InMemoryOrganizationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrganizationStore for InMemoryOrganizationStore {
    async fn insert_organization(&self, organization: Organization) -> AppResult<()> {
        let mut organizations = self.organizations.write().await;
        if organizations.contains_key(&organization.id())
            || organizations
                .values()
                .any(|existing| existing.selector() == organization.selector())
        {
            return Err(AppError::Conflict(format!(
                "organization '{}' already exists",
                organization.selector()
            )));
        }

        organizations.insert(organization.id(), organization);
        Ok(())
    }

    async fn get_organization(
        &self,
        organization_id: OrganizationId,
    ) -> AppResult<Option<Organization>> {
        Ok(self
            .organizations
            .read()
            .await
            .get(&organization_id)
            .cloned())
    }

    async fn get_organization_by_selector(
        &self,
        selector: &str,
    ) -> AppResult<Option<Organization>> {
        Ok(self
            .organizations
            .read()
            .await
            .values()
            .find(|organization| organization.selector() == selector)
            .cloned())
    }

    async fn get_membership(
        &self,
        user_id: &UserId,
        organization_id: OrganizationId,
    ) -> AppResult<Option<TeamMember>> {
        Ok(self
            .organizations
            .read()
            .await
            .get(&organization_id)
            .and_then(|organization| organization.member_for_user(user_id).cloned()))
    }

    async fn patch_organization(
        &self,
        organization_id: OrganizationId,
        patches: &[OrganizationPatch],
    ) -> AppResult<Organization> {
        let mut organizations = self.organizations.write().await;
        let organization = organizations
            .get_mut(&organization_id)
            .ok_or(AppError::OrganizationNotFound)?;
        organization.apply_patches(patches)?;
        Ok(organization.clone())
    }

    async fn permissions_version(&self, organization_id: OrganizationId) -> AppResult<Option<u64>> {
        Ok(self
            .organizations
            .read()
            .await
            .get(&organization_id)
            .map(Organization::permissions_version))
    }

    async fn list_organization_ids(&self) -> AppResult<Vec<OrganizationId>> {
        let mut ids = self
            .organizations
            .read()
            .await
            .keys()
            .copied()
            .collect::<Vec<_>>();
        ids.sort();
        Ok(ids)
    }
}
