use std::sync::Arc;

use chrono::{DateTime, Utc};
use tenantgate_core::{AppError, AppResult, NonEmptyString, UserId};
use tenantgate_domain::{
    ApiKeyCredential, ApiKeyCredentialParts, ApiKeyId, AuditAction, Permission, PermissionSet,
};

use crate::token_crypto::generate_api_key;
use crate::{
    ApiKeyRepository, AuditDispatcher, AuditEvent, AuthContext, AuthorizationService,
    ContextCacheKey, PermissionInvalidator,
};


/// Input payload for issuing an API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateApiKeyInput {
    /// Display name.
    pub name: String,
    /// Fixed permissions of the key.
    pub permissions: PermissionSet,
    /// Optional expiry; must be in the future when set.
    pub expires_at: Option<DateTime<Utc>>,
}

/// API key metadata safe to return after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeySummary {
    /// Key identifier.
    pub id: ApiKeyId,
    /// Display name.
    pub name: String,
    /// Non-secret token prefix.
    pub display_prefix: String,
    /// Fixed permissions.
    pub permissions: PermissionSet,
    /// Creator.
    pub created_by: UserId,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Last successful use.
    pub last_used_at: Option<DateTime<Utc>>,
    /// Revocation flag.
    pub is_revoked: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&ApiKeyCredential> for ApiKeySummary {
    fn from(credential: &ApiKeyCredential) -> Self {
        Self {
            id: credential.id(),
            name: credential.name().to_owned(),
            display_prefix: credential.display_prefix().to_owned(),
            permissions: credential.permissions().clone(),
            created_by: credential.created_by().clone(),
            expires_at: credential.expires_at(),
            last_used_at: credential.last_used_at(),
            is_revoked: credential.is_revoked(),
            created_at: credential.created_at(),
        }
    }
}

/// Newly issued key. The raw token is only ever available here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedApiKey {
    /// Stored metadata.
    pub key: ApiKeySummary,
    /// Raw bearer token.
    pub raw_token: String,
}

/// Application service for organization API keys.
#[derive(Clone)]
pub struct ApiKeyService {
    authorization: AuthorizationService,
    repository: Arc<dyn ApiKeyRepository>,
    invalidator: PermissionInvalidator,
    audit: AuditDispatcher,
}

impl ApiKeyService {
    /// Creates an API key service.
    #[must_use]
    pub fn new(
        authorization: AuthorizationService,
        repository: Arc<dyn ApiKeyRepository>,
        invalidator: PermissionInvalidator,
        audit: AuditDispatcher,
    ) -> Self {
        Self {
            authorization,
            repository,
            invalidator,
            audit,
        }
    }

    /// Issues a key with a subset of the creator's permissions.
    pub async fn create(
        &self,
        actor: &AuthContext,
        input: CreateApiKeyInput,
    ) -> AppResult<CreatedApiKey> {
        let creator = self
            .authorization
            .require_member_permission(actor, Permission::ManageApiKeys)?;

        let name = NonEmptyString::new(input.name.trim())?;
        if input.permissions.is_empty() {
            return Err(AppError::Validation(
                "api key must carry at least one permission".to_owned(),
            ));
        }

        let now = self.authorization.now();
        if let Some(expires_at) = input.expires_at
            && expires_at <= now
        {
            return Err(AppError::InvalidGrantWindow(format!(
                "api key expires_at '{}' must be in the future",
                expires_at.to_rfc3339()
            )));
        }

        self.authorization
            .ensure_within_authority(actor, &input.permissions)?;

        let generated = generate_api_key()?;
        let credential = ApiKeyCredential::from(ApiKeyCredentialParts {
            id: ApiKeyId::new(),
            name,
            key_hash: generated.key_hash,
            display_prefix: generated.display_prefix,
            organization_id: actor.organization_id(),
            created_by: creator.user_id().clone(),
            permissions: input.permissions,
            expires_at: input.expires_at,
            last_used_at: None,
            is_revoked: false,
            created_at: now,
        });
        self.repository.insert(credential.clone()).await?;

        self.audit
            .record(AuditEvent {
                organization_id: actor.organization_id(),
                subject: actor.subject(),
                action: AuditAction::ApiKeyCreated,
                resource_type: "api_key".to_owned(),
                resource_id: credential.id().to_string(),
                detail: Some(format!(
                    "created api key '{}' with [{}]",
                    credential.display_prefix(),
                    credential.permissions().storage_keys().join(", ")
                )),
            })
            .await;

        Ok(CreatedApiKey {
            key: ApiKeySummary::from(&credential),
            raw_token: generated.raw_token,
        })
    }

    /// Lists keys of the actor's organization without secrets.
    pub async fn list(&self, actor: &AuthContext) -> AppResult<Vec<ApiKeySummary>> {
        self.authorization
            .require_permission(actor, Permission::ManageApiKeys)?;

        Ok(self
            .repository
            .list_for_organization(actor.organization_id())
            .await?
            .iter()
            .map(ApiKeySummary::from)
            .collect())
    }

    /// Revokes a key and evicts its cached contexts. Revoking twice is a no-op.
    pub async fn revoke(&self, actor: &AuthContext, key_id: ApiKeyId) -> AppResult<()> {
        self.authorization
            .require_member_permission(actor, Permission::ManageApiKeys)?;

        let organization_id = actor.organization_id();
        let credential = self
            .repository
            .find_by_id(organization_id, key_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("api key '{key_id}' does not exist")))?;
        if credential.is_revoked() {
            return Ok(());
        }

        self.repository.revoke(organization_id, key_id).await?;
        let cache_key = ContextCacheKey::for_api_key(key_id, organization_id);
        self.invalidator
            .invalidate_actor(cache_key.actor_id(), organization_id)
            .await?;

        self.audit
            .record(AuditEvent {
                organization_id,
                subject: actor.subject(),
                action: AuditAction::ApiKeyRevoked,
                resource_type: "api_key".to_owned(),
                resource_id: key_id.to_string(),
                detail: Some(format!("revoked api key '{}'", credential.display_prefix())),
            })
            .await;

        Ok(())
    }
}
