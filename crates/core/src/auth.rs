use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

/// Stable user identifier issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a validated user identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation("user id must not be empty".to_owned()));
        }

        Ok(Self(value))
    }

    /// Returns the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for UserId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Session facts the identity provider vouches for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedSession {
    user_id: UserId,
    active_organization: Option<String>,
}

impl VerifiedSession {
    /// Creates a verified session projection.
    #[must_use]
    pub fn new(user_id: UserId, active_organization: Option<String>) -> Self {
        Self {
            user_id,
            active_organization,
        }
    }

    /// Returns the authenticated user.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the active organization selector, ignoring blank values.
    #[must_use]
    pub fn active_organization(&self) -> Option<&str> {
        self.active_organization
            .as_deref()
            .filter(|value| !value.trim().is_empty())
    }

    /// Returns a copy with a different active organization selector.
    #[must_use]
    pub fn with_active_organization(mut self, selector: impl Into<String>) -> Self {
        self.active_organization = Some(selector.into());
        self
    }
}
