use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use tenantgate_core::{AppError, AppResult, NonEmptyString};

use crate::security::{Permission, PermissionSet};

/// Key of the built-in administrator role.
pub const ADMIN_ROLE_KEY: &str = "admin";

/// Organization-scoped role key.
///
/// Keys are lowercase slugs and never change once a member or invite
/// references them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleKey(String);

impl RoleKey {
    /// Creates a validated role key.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.is_empty() || value.len() > 64 {
            return Err(AppError::Validation(
                "role key must be between 1 and 64 characters".to_owned(),
            ));
        }

        if !value.chars().all(|character| {
            character.is_ascii_lowercase()
                || character.is_ascii_digit()
                || character == '_'
                || character == '-'
        }) {
            return Err(AppError::Validation(format!(
                "role key '{value}' may only contain lowercase letters, digits, '_' or '-'"
            )));
        }

        Ok(Self(value))
    }

    /// Returns the built-in administrator role key.
    #[must_use]
    pub fn admin() -> Self {
        Self(ADMIN_ROLE_KEY.to_owned())
    }

    /// Returns whether this is the built-in administrator role key.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.0 == ADMIN_ROLE_KEY
    }

    /// Returns the underlying key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for RoleKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Named permission bundle assignable to members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    key: RoleKey,
    name: NonEmptyString,
    description: String,
    permissions: PermissionSet,
    is_system: bool,
}

impl Role {
    /// Creates a role.
    #[must_use]
    pub fn new(
        key: RoleKey,
        name: NonEmptyString,
        description: impl Into<String>,
        permissions: PermissionSet,
        is_system: bool,
    ) -> Self {
        Self {
            key,
            name,
            description: description.into(),
            permissions,
            is_system,
        }
    }

    /// Returns the role key.
    #[must_use]
    pub fn key(&self) -> &RoleKey {
        &self.key
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the static permissions of the role.
    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Returns what members of the role actually hold. The admin role holds
    /// the full catalog whatever its stored set says.
    #[must_use]
    pub fn granted_permissions(&self) -> PermissionSet {
        if self.key.is_admin() {
            PermissionSet::full()
        } else {
            self.permissions.clone()
        }
    }

    /// Returns whether the role is system managed.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.is_system
    }

    /// Returns a copy with updated presentation fields and permissions.
    #[must_use]
    pub fn with_changes(
        &self,
        name: Option<NonEmptyString>,
        description: Option<String>,
        permissions: Option<PermissionSet>,
    ) -> Self {
        Self {
            key: self.key.clone(),
            name: name.unwrap_or_else(|| self.name.clone()),
            description: description.unwrap_or_else(|| self.description.clone()),
            permissions: permissions.unwrap_or_else(|| self.permissions.clone()),
            is_system: self.is_system,
        }
    }
}

/// Default role shipped with every new organization.
#[derive(Debug, Clone, Copy)]
pub struct RoleTemplate {
    key: &'static str,
    name: &'static str,
    description: &'static str,
    permissions: &'static [Permission],
    is_system: bool,
}

const EDITOR_PERMISSIONS: &[Permission] = &[
    Permission::ViewForms,
    Permission::ManageForms,
    Permission::ViewPositions,
    Permission::ManagePositions,
    Permission::ViewApplications,
    Permission::ManageApplications,
    Permission::ViewMessages,
    Permission::SendMessages,
];

const VIEWER_PERMISSIONS: &[Permission] = &[
    Permission::ViewForms,
    Permission::ViewPositions,
    Permission::ViewApplications,
    Permission::ViewMessages,
];

const DEFAULT_TEMPLATES: &[RoleTemplate] = &[
    RoleTemplate {
        key: ADMIN_ROLE_KEY,
        name: "Administrator",
        description: "Full access to the organization",
        permissions: &[],
        is_system: true,
    },
    RoleTemplate {
        key: "editor",
        name: "Editor",
        description: "Manages forms, positions, applications and messaging",
        permissions: EDITOR_PERMISSIONS,
        is_system: false,
    },
    RoleTemplate {
        key: "viewer",
        name: "Viewer",
        description: "Read-only access",
        permissions: VIEWER_PERMISSIONS,
        is_system: false,
    },
];

impl RoleTemplate {
    /// Returns the default templates in display order.
    #[must_use]
    pub fn defaults() -> &'static [Self] {
        DEFAULT_TEMPLATES
    }

    /// Returns the template key.
    #[must_use]
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Materializes the template as a role.
    ///
    /// The administrator template always resolves to the full catalog.
    pub fn to_role(&self) -> AppResult<Role> {
        let permissions = if self.key == ADMIN_ROLE_KEY {
            PermissionSet::full()
        } else {
            self.permissions.iter().copied().collect()
        };

        Ok(Role::new(
            RoleKey::new(self.key)?,
            NonEmptyString::new(self.name)?,
            self.description,
            permissions,
            self.is_system,
        ))
    }
}

#[cfg(test)]
mod tests {
    use tenantgate_core::{AppResult, NonEmptyString};

    use super::{Role, RoleKey, RoleTemplate};
    use crate::security::{Permission, PermissionSet};

    #[test]
    fn role_key_rejects_uppercase_and_spaces() {
        assert!(RoleKey::new("Hiring Manager").is_err());
        assert!(RoleKey::new("").is_err());
        assert!(RoleKey::new("hiring-manager_2").is_ok());
    }

    #[test]
    fn admin_template_holds_full_catalog() -> AppResult<()> {
        let admin = RoleTemplate::defaults()
            .iter()
            .find(|template| template.key() == "admin")
            .map(RoleTemplate::to_role)
            .transpose()?;

        let admin = admin.ok_or_else(|| {
            tenantgate_core::AppError::Internal("missing admin template".to_owned())
        })?;
        assert!(admin.is_system());
        assert_eq!(admin.permissions(), &PermissionSet::full());
        Ok(())
    }

    #[test]
    fn admin_role_grants_full_catalog_even_when_stored_set_is_stale() -> AppResult<()> {
        let stale = Role::new(
            RoleKey::admin(),
            NonEmptyString::new("Administrator")?,
            "",
            PermissionSet::from([Permission::ViewForms]),
            true,
        );
        assert_eq!(stale.granted_permissions(), PermissionSet::full());

        let custom = Role::new(
            RoleKey::new("reader")?,
            NonEmptyString::new("Reader")?,
            "",
            PermissionSet::from([Permission::ViewForms]),
            false,
        );
        assert_eq!(custom.granted_permissions(), custom.permissions().clone());
        Ok(())
    }

    #[test]
    fn viewer_template_is_read_only() -> AppResult<()> {
        let roles = RoleTemplate::defaults()
            .iter()
            .map(RoleTemplate::to_role)
            .collect::<AppResult<Vec<_>>>()?;

        let viewer = roles.iter().find(|role| role.key().as_str() == "viewer");
        assert!(viewer.is_some_and(|role| {
            role.permissions().contains(Permission::ViewForms)
                && !role.permissions().contains(Permission::ManageForms)
        }));
        Ok(())
    }
}
