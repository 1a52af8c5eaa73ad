use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenantgate_application::{ApiKeySummary, CreatedApiKey};
use tenantgate_domain::TemporaryGrant;
use ts_rs::TS;

/// Incoming payload for issuing a temporary grant.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-temporary-grant-request.ts"
)]
pub struct CreateTemporaryGrantRequest {
    pub user_id: String,
    pub permissions: Vec<String>,
    pub expires_at: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TemporaryGrantListQuery {
    pub active_only: Option<bool>,
}

/// API representation of a temporary grant.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/temporary-grant-response.ts"
)]
pub struct TemporaryGrantResponse {
    pub key: String,
    pub user_id: String,
    pub permissions: Vec<String>,
    pub expires_at: String,
    pub granted_by: String,
    pub reason: Option<String>,
    pub granted_at: String,
    pub is_active: bool,
}

impl TemporaryGrantResponse {
    pub fn from_grant(grant: &TemporaryGrant, now: DateTime<Utc>) -> Self {
        Self {
            key: grant.key().to_string(),
            user_id: grant.user_id().to_string(),
            permissions: grant.permissions().storage_keys(),
            expires_at: grant.expires_at().to_rfc3339(),
            granted_by: grant.granted_by().to_string(),
            reason: grant.reason().map(str::to_owned),
            granted_at: grant.granted_at().to_rfc3339(),
            is_active: grant.is_active_at(now),
        }
    }
}

/// Number of expired grants purged.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/cleanup-response.ts"
)]
pub struct CleanupResponse {
    pub removed: usize,
}

/// Incoming payload for issuing an API key.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-api-key-request.ts"
)]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub permissions: Vec<String>,
    pub expires_at: Option<String>,
}

/// API key metadata. Never carries the secret.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/api-key-response.ts"
)]
pub struct ApiKeyResponse {
    pub id: String,
    pub name: String,
    pub display_prefix: String,
    pub permissions: Vec<String>,
    pub created_by: String,
    pub expires_at: Option<String>,
    pub last_used_at: Option<String>,
    pub is_revoked: bool,
    pub created_at: String,
}

impl From<ApiKeySummary> for ApiKeyResponse {
    fn from(value: ApiKeySummary) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            display_prefix: value.display_prefix,
            permissions: value.permissions.storage_keys(),
            created_by: value.created_by.to_string(),
            expires_at: value.expires_at.map(|timestamp| timestamp.to_rfc3339()),
            last_used_at: value.last_used_at.map(|timestamp| timestamp.to_rfc3339()),
            is_revoked: value.is_revoked,
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

/// Creation response; the only place the raw token is ever returned.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/created-api-key-response.ts"
)]
pub struct CreatedApiKeyResponse {
    pub key: ApiKeyResponse,
    pub token: String,
}

impl From<CreatedApiKey> for CreatedApiKeyResponse {
    fn from(value: CreatedApiKey) -> Self {
        Self {
            key: ApiKeyResponse::from(value.key),
            token: value.raw_token,
        }
    }
}
