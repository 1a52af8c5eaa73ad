use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tenantgate_application::ApiKeyRepository;
use tenantgate_core::{AppError, AppResult, OrganizationId};
use tenantgate_domain::{ApiKeyCredential, ApiKeyId};
use tokio::sync::RwLock;

/// In-memory API key repository.
#[derive(Default)]
pub struct InMemoryApiKeyRepository {
    keys: RwLock<HashMap<ApiKeyId, ApiKeyCredential>>,
}

impl InMemoryApiKeyRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn insert(&self, credential: ApiKeyCredential) -> AppResult<()> {
        let mut keys = self.keys.write().await;
        if keys.contains_key(&credential.id())
            || keys
                .values()
                .any(|existing| existing.key_hash() == credential.key_hash())
        {
            return Err(AppError::Conflict(format!(
                "api key '{}' already exists",
                credential.id()
            )));
        }

        keys.insert(credential.id(), credential);
        Ok(())
    }

    async fn find_by_hash(&self, key_hash: &str) -> AppResult<Option<ApiKeyCredential>> {
        Ok(self
            .keys
            .read()
            .await
            .values()
            .find(|credential| credential.key_hash() == key_hash)
            .cloned())
    }

    async fn find_by_id(
        &self,
        organization_id: OrganizationId,
        key_id: ApiKeyId,
    ) -> AppResult<Option<ApiKeyCredential>> {
        Ok(self
            .keys
            .read()
            .await
            .get(&key_id)
            .filter(|credential| credential.organization_id() == organization_id)
            .cloned())
    }

    async fn list_for_organization(
        &self,
        organization_id: OrganizationId,
    ) -> AppResult<Vec<ApiKeyCredential>> {
        let mut credentials = self
            .keys
            .read()
            .await
            .values()
            .filter(|credential| credential.organization_id() == organization_id)
            .cloned()
            .collect::<Vec<_>>();
        credentials.sort_by(|left, right| {
            right
                .created_at()
                .cmp(&left.created_at())
                .then_with(|| right.id().as_uuid().cmp(&left.id().as_uuid()))
        });
        Ok(credentials)
    }

    async fn revoke(&self, organization_id: OrganizationId, key_id: ApiKeyId) -> AppResult<bool> {
        let mut keys = self.keys.write().await;
        let Some(credential) = keys
            .get_mut(&key_id)
            .filter(|credential| credential.organization_id() == organization_id)
        else {
            return Ok(false);
        };

        let was_active = !credential.is_revoked();
        credential.revoke();
        Ok(was_active)
    }

    async fn touch_last_used(&self, key_id: ApiKeyId, used_at: DateTime<Utc>) -> AppResult<()> {
        if let Some(credential) = self.keys.write().await.get_mut(&key_id) {
            credential.touch(used_at);
        }
        Ok(())
    }
}
