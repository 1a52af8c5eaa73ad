use async_trait::async_trait;
use tenantgate_core::{AppResult, OrganizationId, UserId};
use tenantgate_domain::{Organization, OrganizationPatch, TeamMember};

/// Document store port holding organizations with their roles, members and grants.
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Persists a new organization document.
    async fn insert_organization(&self, organization: Organization) -> AppResult<()>;

    /// Loads an organization by identifier.
    async fn get_organization(
        &self,
        organization_id: OrganizationId,
    ) -> AppResult<Option<Organization>>;

    /// Loads an organization by its identity-provider selector.
    async fn get_organization_by_selector(&self, selector: &str)
    -> AppResult<Option<Organization>>;

    /// Returns the membership entry of a user in an organization.
    async fn get_membership(
        &self,
        user_id: &UserId,
        organization_id: OrganizationId,
    ) -> AppResult<Option<TeamMember>>;

    /// Applies all patches atomically and returns the updated document.
    async fn patch_organization(
        &self,
        organization_id: OrganizationId,
        patches: &[OrganizationPatch],
    ) -> AppResult<Organization>;

    /// Reads only the permissions version.
    async fn permissions_version(&self, organization_id: OrganizationId) -> AppResult<Option<u64>>;

    /// Lists identifiers of every stored organization.
    async fn list_organization_ids(&self) -> AppResult<Vec<OrganizationId>>;
}
