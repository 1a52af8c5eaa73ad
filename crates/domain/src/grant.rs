use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenantgate_core::{AppError, AppResult, UserId};
use uuid::Uuid;

use crate::security::PermissionSet;

/// Temporary grant key. UUID v7, so keys sort by issuance time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantKey(Uuid);

impl GrantKey {
    /// Generates a new time-ordered grant key.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a key from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Parses a transport value.
    pub fn parse(value: &str) -> AppResult<Self> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|_| AppError::Validation(format!("invalid grant key '{value}'")))
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Display for GrantKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Time-bound permission addition layered on top of a member's role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporaryGrant {
    key: GrantKey,
    user_id: UserId,
    permissions: PermissionSet,
    expires_at: DateTime<Utc>,
    granted_by: UserId,
    reason: Option<String>,
    granted_at: DateTime<Utc>,
}

impl TemporaryGrant {
    /// Rehydrates a grant from stored values without window validation.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        key: GrantKey,
        user_id: UserId,
        permissions: PermissionSet,
        expires_at: DateTime<Utc>,
        granted_by: UserId,
        reason: Option<String>,
        granted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            user_id,
            permissions,
            expires_at,
            granted_by,
            reason,
            granted_at,
        }
    }

    /// Issues a new grant at `now`.
    ///
    /// The permission set must be non-empty and the expiry strictly after `now`.
    pub fn issue(
        user_id: UserId,
        permissions: PermissionSet,
        expires_at: DateTime<Utc>,
        granted_by: UserId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        if permissions.is_empty() {
            return Err(AppError::Validation(
                "temporary grant must carry at least one permission".to_owned(),
            ));
        }

        if expires_at <= now {
            return Err(AppError::InvalidGrantWindow(format!(
                "expires_at '{}' must be after '{}'",
                expires_at.to_rfc3339(),
                now.to_rfc3339()
            )));
        }

        let reason = reason
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        Ok(Self::new(
            GrantKey::generate(),
            user_id,
            permissions,
            expires_at,
            granted_by,
            reason,
            now,
        ))
    }

    /// Returns the grant key.
    #[must_use]
    pub fn key(&self) -> GrantKey {
        self.key
    }

    /// Returns the grantee.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the granted permissions.
    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Returns the expiry instant.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns the granting user.
    #[must_use]
    pub fn granted_by(&self) -> &UserId {
        &self.granted_by
    }

    /// Returns the free-text justification.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Returns the issuance instant.
    #[must_use]
    pub fn granted_at(&self) -> DateTime<Utc> {
        self.granted_at
    }

    /// Returns whether the grant contributes permissions at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
