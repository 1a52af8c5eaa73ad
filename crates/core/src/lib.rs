//! Shared primitives for all Rust crates in tenantgate.

#![forbid(unsafe_code)]

/// Authentication primitives shared across services.
pub mod auth;
/// Time source abstraction.
pub mod clock;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use auth::{UserId, VerifiedSession};
pub use clock::{Clock, FixedClock, SystemClock};

/// Result type used across tenantgate crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Organization identifier used as the partition key for every tenant resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrganizationId(Uuid);

impl OrganizationId {
    /// Creates a random organization identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an organization identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OrganizationId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for OrganizationId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Application error categories.
///
/// Credential and access failures carry as little detail as possible so that
/// transport mappings never leak whether an organization, member or key exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// No verifiable credential was presented.
    #[error("authentication required")]
    Unauthenticated,

    /// Authenticated session without an active organization selector.
    #[error("no active organization selected")]
    NoOrganizationSelected,

    /// The selected organization could not be resolved.
    #[error("organization not found")]
    OrganizationNotFound,

    /// The caller is not a member of the selected organization.
    #[error("not a member of this organization")]
    NotAMember,

    /// The resolved context lacks the required capability.
    #[error("permission denied: missing '{permission}'")]
    PermissionDenied {
        /// Storage key of the missing permission.
        permission: String,
    },

    /// API key credential did not resolve.
    #[error("invalid api key")]
    InvalidApiKey,

    /// API key credential resolved but has expired.
    #[error("api key expired")]
    ExpiredApiKey,

    /// Grant or key expiry is missing or not in the future.
    #[error("invalid grant window: {0}")]
    InvalidGrantWindow(String),

    /// Requested permissions exceed the actor's own authority.
    #[error("escalation denied: actor does not hold '{permission}'")]
    EscalationDenied {
        /// Storage key of the first permission the actor does not hold.
        permission: String,
    },

    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns whether the error belongs to the credential family callers treat as unauthenticated.
    #[must_use]
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated | Self::InvalidApiKey | Self::ExpiredApiKey
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString, OrganizationId};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn organization_id_formats_as_uuid() {
        let organization_id = OrganizationId::new();
        assert_eq!(organization_id.to_string().len(), 36);
    }

    #[test]
    fn api_key_failures_are_credential_failures() {
        assert!(AppError::InvalidApiKey.is_credential_failure());
        assert!(AppError::ExpiredApiKey.is_credential_failure());
        assert!(!AppError::NotAMember.is_credential_failure());
    }

    #[test]
    fn permission_denied_names_missing_key() {
        let error = AppError::PermissionDenied {
            permission: "manage_forms".to_owned(),
        };
        assert!(error.to_string().contains("manage_forms"));
    }
}
