use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenantgate_core::{AppError, AppResult, UserId};
use uuid::Uuid;

use crate::role::RoleKey;

/// Membership entry key, distinct from the referenced user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberKey(String);

impl MemberKey {
    /// Creates a validated member key.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation("member key must not be empty".to_owned()));
        }

        Ok(Self(value))
    }

    /// Generates a fresh random member key.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns the underlying key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for MemberKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Organization membership entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    key: MemberKey,
    user_id: UserId,
    role_key: RoleKey,
    joined_at: DateTime<Utc>,
}

impl TeamMember {
    /// Creates a membership entry.
    #[must_use]
    pub fn new(
        key: MemberKey,
        user_id: UserId,
        role_key: RoleKey,
        joined_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            user_id,
            role_key,
            joined_at,
        }
    }

    /// Returns the member key.
    #[must_use]
    pub fn key(&self) -> &MemberKey {
        &self.key
    }

    /// Returns the referenced user.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the assigned role key.
    #[must_use]
    pub fn role_key(&self) -> &RoleKey {
        &self.role_key
    }

    /// Returns when the member joined.
    #[must_use]
    pub fn joined_at(&self) -> DateTime<Utc> {
        self.joined_at
    }

    /// Returns a copy assigned to another role.
    #[must_use]
    pub fn with_role(&self, role_key: RoleKey) -> Self {
        Self {
            role_key,
            ..self.clone()
        }
    }
}

/// Pending invite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InviteKey(String);

impl InviteKey {
    /// Creates a validated invite key.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation("invite key must not be empty".to_owned()));
        }

        Ok(Self(value))
    }

    /// Generates a fresh random invite key.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns the underlying key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for InviteKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Invite awaiting acceptance. Holds a role reference until accepted or cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInvite {
    key: InviteKey,
    email: String,
    role_key: RoleKey,
    invited_at: DateTime<Utc>,
}

impl PendingInvite {
    /// Creates a pending invite after basic email shape validation.
    pub fn new(
        key: InviteKey,
        email: impl Into<String>,
        role_key: RoleKey,
        invited_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let email = email.into().trim().to_ascii_lowercase();
        let valid = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid {
            return Err(AppError::Validation(format!("invalid invite email '{email}'")));
        }

        Ok(Self {
            key,
            email,
            role_key,
            invited_at,
        })
    }

    /// Returns the invite key.
    #[must_use]
    pub fn key(&self) -> &InviteKey {
        &self.key
    }

    /// Returns the invited email, normalized to lowercase.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns the role the invitee will receive.
    #[must_use]
    pub fn role_key(&self) -> &RoleKey {
        &self.role_key
    }

    /// Returns when the invite was recorded.
    #[must_use]
    pub fn invited_at(&self) -> DateTime<Utc> {
        self.invited_at
    }
}
