use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tenantgate_core::{AppResult, OrganizationId};
use tenantgate_domain::{ApiKeyCredential, ApiKeyId};

/// Repository port for API key credentials.
#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    /// Persists a newly issued credential.
    async fn insert(&self, credential: ApiKeyCredential) -> AppResult<()>;

    /// Finds a credential by secret hash, including revoked ones.
    async fn find_by_hash(&self, key_hash: &str) -> AppResult<Option<ApiKeyCredential>>;

    /// Finds a credential of one organization by id.
    async fn find_by_id(
        &self,
        organization_id: OrganizationId,
        key_id: ApiKeyId,
    ) -> AppResult<Option<ApiKeyCredential>>;

    /// Lists every credential of an organization, newest first.
    async fn list_for_organization(
        &self,
        organization_id: OrganizationId,
    ) -> AppResult<Vec<ApiKeyCredential>>;

    /// Soft-deletes a credential. Returns whether it was active before.
    async fn revoke(&self, organization_id: OrganizationId, key_id: ApiKeyId) -> AppResult<bool>;

    /// Records the last successful use.
    async fn touch_last_used(&self, key_id: ApiKeyId, used_at: DateTime<Utc>) -> AppResult<()>;
}
