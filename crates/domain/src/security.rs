use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tenantgate_core::AppError;

/// Capabilities enforced by the authorization guard.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Allows reading forms.
    ViewForms,
    /// Allows creating, editing and archiving forms.
    ManageForms,
    /// Allows reading job positions.
    ViewPositions,
    /// Allows mutating job positions.
    ManagePositions,
    /// Allows reading submitted applications.
    ViewApplications,
    /// Allows changing application status and notes.
    ManageApplications,
    /// Allows reading conversation threads.
    ViewMessages,
    /// Allows sending messages to applicants.
    SendMessages,
    /// Allows inviting, removing and re-roling team members.
    ManageTeam,
    /// Allows creating, editing and deleting roles.
    ManageRoles,
    /// Allows issuing and revoking temporary grants.
    ManageGrants,
    /// Allows issuing and revoking API keys.
    ManageApiKeys,
    /// Allows reading the audit log.
    ViewAuditLog,
    /// Allows editing organization settings.
    ManageOrganization,
}

const ALL_PERMISSIONS: &[Permission] = &[
    Permission::ViewForms,
    Permission::ManageForms,
    Permission::ViewPositions,
    Permission::ManagePositions,
    Permission::ViewApplications,
    Permission::ManageApplications,
    Permission::ViewMessages,
    Permission::SendMessages,
    Permission::ManageTeam,
    Permission::ManageRoles,
    Permission::ManageGrants,
    Permission::ManageApiKeys,
    Permission::ViewAuditLog,
    Permission::ManageOrganization,
];

impl Permission {
    /// Returns a stable storage value for this permission.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewForms => "view_forms",
            Self::ManageForms => "manage_forms",
            Self::ViewPositions => "view_positions",
            Self::ManagePositions => "manage_positions",
            Self::ViewApplications => "view_applications",
            Self::ManageApplications => "manage_applications",
            Self::ViewMessages => "view_messages",
            Self::SendMessages => "send_messages",
            Self::ManageTeam => "manage_team",
            Self::ManageRoles => "manage_roles",
            Self::ManageGrants => "manage_grants",
            Self::ManageApiKeys => "manage_api_keys",
            Self::ViewAuditLog => "view_audit_log",
            Self::ManageOrganization => "manage_organization",
        }
    }

    /// Returns all known permissions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        ALL_PERMISSIONS
    }

    /// Parses a transport value into a permission.
    pub fn from_transport(value: &str) -> Result<Self, AppError> {
        Self::from_str(value)
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|permission| permission.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown permission value '{value}'")))
    }
}

/// Deduplicated, deterministically ordered set of permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// Creates an empty permission set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding every catalog permission.
    #[must_use]
    pub fn full() -> Self {
        Permission::all().iter().copied().collect()
    }

    /// Decodes storage keys, returning unknown keys separately.
    ///
    /// Unknown keys never grant anything; callers decide whether to log them.
    #[must_use]
    pub fn from_storage_keys<I, S>(keys: I) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut permissions = Self::new();
        let mut unknown = Vec::new();
        for key in keys {
            match Permission::from_str(key.as_ref()) {
                Ok(permission) => {
                    permissions.insert(permission);
                }
                Err(_) => unknown.push(key.as_ref().to_owned()),
            }
        }

        (permissions, unknown)
    }

    /// Returns the stable storage keys in set order.
    #[must_use]
    pub fn storage_keys(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|permission| permission.as_str().to_owned())
            .collect()
    }

    /// Adds one permission, returning whether it was newly inserted.
    pub fn insert(&mut self, permission: Permission) -> bool {
        self.0.insert(permission)
    }

    /// Returns whether the permission is a member of the set.
    #[must_use]
    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    /// Adds every permission of `other` to this set.
    pub fn extend_from(&mut self, other: &Self) {
        self.0.extend(other.0.iter().copied());
    }

    /// Returns the union of both sets.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.extend_from(other);
        merged
    }

    /// Returns the permissions held by both sets.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        Self(self.0.intersection(&other.0).copied().collect())
    }

    /// Returns whether every permission of `other` is held by this set.
    #[must_use]
    pub fn is_superset_of(&self, other: &Self) -> bool {
        self.0.is_superset(&other.0)
    }

    /// Returns the first permission of `requested` this set does not hold.
    #[must_use]
    pub fn first_missing(&self, requested: &Self) -> Option<Permission> {
        requested.0.difference(&self.0).next().copied()
    }

    /// Iterates permissions in set order.
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    /// Returns the number of permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the set holds no permissions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Permission; N]> for PermissionSet {
    fn from(value: [Permission; N]) -> Self {
        value.into_iter().collect()
    }
}

/// Stable audit actions emitted by authorization use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a custom role is created.
    RoleCreated,
    /// Emitted when a role's name, description or permissions change.
    RoleUpdated,
    /// Emitted when a role is deleted.
    RoleDeleted,
    /// Emitted when a member is moved to another role.
    MemberRoleUpdated,
    /// Emitted when a member is removed from the organization.
    MemberRemoved,
    /// Emitted when an invite referencing a role is recorded.
    InviteCreated,
    /// Emitted when a pending invite is cancelled.
    InviteCancelled,
    /// Emitted when an invite is accepted and the member joins.
    InviteAccepted,
    /// Emitted when an organization is provisioned.
    OrganizationProvisioned,
    /// Emitted when a temporary grant is issued.
    TemporaryGrantCreated,
    /// Emitted when a temporary grant is revoked.
    TemporaryGrantRevoked,
    /// Emitted when expired temporary grants are purged.
    TemporaryGrantsCleanedUp,
    /// Emitted when an API key is issued.
    ApiKeyCreated,
    /// Emitted when an API key is revoked.
    ApiKeyRevoked,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleCreated => "role.created",
            Self::RoleUpdated => "role.updated",
            Self::RoleDeleted => "role.deleted",
            Self::MemberRoleUpdated => "member.role_updated",
            Self::MemberRemoved => "member.removed",
            Self::InviteCreated => "invite.created",
            Self::InviteCancelled => "invite.cancelled",
            Self::InviteAccepted => "invite.accepted",
            Self::OrganizationProvisioned => "organization.provisioned",
            Self::TemporaryGrantCreated => "grant.created",
            Self::TemporaryGrantRevoked => "grant.revoked",
            Self::TemporaryGrantsCleanedUp => "grant.cleanup",
            Self::ApiKeyCreated => "api_key.created",
            Self::ApiKeyRevoked => "api_key.revoked",
        }
    }
}
