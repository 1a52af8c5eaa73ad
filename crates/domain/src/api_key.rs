use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenantgate_core::{AppError, AppResult, NonEmptyString, OrganizationId, UserId};
use uuid::Uuid;

use crate::security::PermissionSet;

/// Fixed scheme tag every API key token starts with.
pub const API_KEY_SCHEME: &str = "tgk";

/// API key identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKeyId(Uuid);

impl ApiKeyId {
    /// Creates a random key identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Parses a transport value.
    pub fn parse(value: &str) -> AppResult<Self> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|_| AppError::Validation(format!("invalid api key id '{value}'")))
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ApiKeyId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ApiKeyId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Persisted API key record. Holds only the hash of the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyCredential {
    id: ApiKeyId,
    name: NonEmptyString,
    key_hash: String,
    display_prefix: String,
    organization_id: OrganizationId,
    created_by: UserId,
    permissions: PermissionSet,
    expires_at: Option<DateTime<Utc>>,
    last_used_at: Option<DateTime<Utc>>,
    is_revoked: bool,
    created_at: DateTime<Utc>,
}

/// Field bundle used to construct or rehydrate an [`ApiKeyCredential`].
#[derive(Debug, Clone)]
pub struct ApiKeyCredentialParts {
    /// Key identifier.
    pub id: ApiKeyId,
    /// Human-readable name.
    pub name: NonEmptyString,
    /// SHA-256 hex digest of the raw token.
    pub key_hash: String,
    /// Non-secret prefix shown in listings.
    pub display_prefix: String,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Creating user.
    pub created_by: UserId,
    /// Fixed permission set.
    pub permissions: PermissionSet,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Last successful use, best-effort.
    pub last_used_at: Option<DateTime<Utc>>,
    /// Soft-delete marker.
    pub is_revoked: bool,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

impl From<ApiKeyCredentialParts> for ApiKeyCredential {
    fn from(parts: ApiKeyCredentialParts) -> Self {
        Self {
            id: parts.id,
            name: parts.name,
            key_hash: parts.key_hash,
            display_prefix: parts.display_prefix,
            organization_id: parts.organization_id,
            created_by: parts.created_by,
            permissions: parts.permissions,
            expires_at: parts.expires_at,
            last_used_at: parts.last_used_at,
            is_revoked: parts.is_revoked,
            created_at: parts.created_at,
        }
    }
}

impl ApiKeyCredential {
    /// Returns the key identifier.
    #[must_use]
    pub fn id(&self) -> ApiKeyId {
        self.id
    }

    /// Returns the human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the stored secret hash.
    #[must_use]
    pub fn key_hash(&self) -> &str {
        self.key_hash.as_str()
    }

    /// Returns the display prefix.
    #[must_use]
    pub fn display_prefix(&self) -> &str {
        self.display_prefix.as_str()
    }

    /// Returns the owning organization.
    #[must_use]
    pub fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    /// Returns the creating user.
    #[must_use]
    pub fn created_by(&self) -> &UserId {
        &self.created_by
    }

    /// Returns the fixed permission set.
    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Returns the optional expiry.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns the last recorded use.
    #[must_use]
    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.last_used_at
    }

    /// Returns whether the key was revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.is_revoked
    }

    /// Returns the creation instant.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns whether the key has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Marks the key revoked.
    pub fn revoke(&mut self) {
        self.is_revoked = true;
    }

    /// Records a successful use.
    pub fn touch(&mut self, used_at: DateTime<Utc>) {
        self.last_used_at = Some(used_at);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use tenantgate_core::{AppResult, NonEmptyString, OrganizationId, UserId};

    use super::{ApiKeyCredential, ApiKeyCredentialParts, ApiKeyId};
    use crate::security::{Permission, PermissionSet};

    fn credential(expires_in: Option<Duration>) -> AppResult<ApiKeyCredential> {
        let now = Utc::now();
        Ok(ApiKeyCredential::from(ApiKeyCredentialParts {
            id: ApiKeyId::new(),
            name: NonEmptyString::new("ci")?,
            key_hash: "00".repeat(32),
            display_prefix: "tgk_abc123".to_owned(),
            organization_id: OrganizationId::new(),
            created_by: UserId::new("u1")?,
            permissions: PermissionSet::from([Permission::ViewForms]),
            expires_at: expires_in.map(|duration| now + duration),
            last_used_at: None,
            is_revoked: false,
            created_at: now,
        }))
    }

    #[test]
    fn key_without_expiry_never_expires() -> AppResult<()> {
        let credential = credential(None)?;
        assert!(!credential.is_expired_at(Utc::now() + Duration::days(3650)));
        Ok(())
    }

    #[test]
    fn key_expires_at_boundary() -> AppResult<()> {
        let credential = credential(Some(Duration::minutes(10)))?;
        let expires_at = credential.expires_at().unwrap_or_default();
        assert!(!credential.is_expired_at(expires_at - Duration::seconds(1)));
        assert!(credential.is_expired_at(expires_at));
        Ok(())
    }
}
