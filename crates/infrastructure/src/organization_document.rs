//! JSONB storage shape of an organization.
//!
//! Keyed collections are stored as ordered arrays and permissions as plain
//! string keys. Unknown permission keys are dropped on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenantgate_core::{AppError, AppResult, NonEmptyString, OrganizationId, UserId};
use tenantgate_domain::{
    GrantKey, INITIAL_PERMISSIONS_VERSION, InviteKey, MemberKey, Organization, OrganizationParts,
    PendingInvite, PermissionSet, Role, RoleKey, TeamMember, TemporaryGrant,
};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct OrganizationDocument {
    #[serde(default)]
    pub(crate) roles: Vec<RoleDocument>,
    #[serde(default)]
    pub(crate) members: Vec<MemberDocument>,
    #[serde(default)]
    pub(crate) invites: Vec<InviteDocument>,
    #[serde(default)]
    pub(crate) temporary_grants: Vec<GrantDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RoleDocument {
    key: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    permissions: Vec<String>,
    #[serde(default)]
    is_system: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct MemberDocument {
    key: String,
    user_id: String,
    role_key: String,
    joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct InviteDocument {
    key: String,
    email: String,
    role_key: String,
    invited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct GrantDocument {
    key: Uuid,
    user_id: String,
    #[serde(default)]
    permissions: Vec<String>,
    expires_at: DateTime<Utc>,
    granted_by: String,
    #[serde(default)]
    reason: Option<String>,
    granted_at: DateTime<Utc>,
}

/// Flat row columns stored next to the document.
pub(crate) struct OrganizationHeader {
    pub(crate) id: OrganizationId,
    pub(crate) selector: String,
    pub(crate) name: String,
    pub(crate) permissions_version: i64,
}

impl OrganizationDocument {
    pub(crate) fn from_organization(organization: &Organization) -> Self {
        Self {
            roles: organization
                .roles()
                .map(|role| RoleDocument {
                    key: role.key().as_str().to_owned(),
                    name: role.name().to_owned(),
                    description: role.description().to_owned(),
                    permissions: role.permissions().storage_keys(),
                    is_system: role.is_system(),
                })
                .collect(),
            members: organization
                .members()
                .map(MemberDocument::from_member)
                .collect(),
            invites: organization
                .invites()
                .map(|invite| InviteDocument {
                    key: invite.key().as_str().to_owned(),
                    email: invite.email().to_owned(),
                    role_key: invite.role_key().as_str().to_owned(),
                    invited_at: invite.invited_at(),
                })
                .collect(),
            temporary_grants: organization
                .temporary_grants()
                .map(|grant| GrantDocument {
                    key: grant.key().as_uuid(),
                    user_id: grant.user_id().as_str().to_owned(),
                    permissions: grant.permissions().storage_keys(),
                    expires_at: grant.expires_at(),
                    granted_by: grant.granted_by().as_str().to_owned(),
                    reason: grant.reason().map(str::to_owned),
                    granted_at: grant.granted_at(),
                })
                .collect(),
        }
    }

    pub(crate) fn into_organization(self, header: OrganizationHeader) -> AppResult<Organization> {
        let organization_id = header.id;
        let roles = self
            .roles
            .into_iter()
            .map(|role| {
                let permissions = decode_permissions(organization_id, &role.key, role.permissions);
                Ok(Role::new(
                    RoleKey::new(role.key)?,
                    NonEmptyString::new(role.name)?,
                    role.description,
                    permissions,
                    role.is_system,
                ))
            })
            .collect::<AppResult<Vec<_>>>()
            .map_err(|error| corrupt(organization_id, "roles", error))?;

        let members = self
            .members
            .into_iter()
            .map(MemberDocument::into_member)
            .collect::<AppResult<Vec<_>>>()
            .map_err(|error| corrupt(organization_id, "members", error))?;

        let invites = self
            .invites
            .into_iter()
            .map(|invite| {
                PendingInvite::new(
                    InviteKey::new(invite.key)?,
                    invite.email,
                    RoleKey::new(invite.role_key)?,
                    invite.invited_at,
                )
            })
            .collect::<AppResult<Vec<_>>>()
            .map_err(|error| corrupt(organization_id, "invites", error))?;

        let temporary_grants = self
            .temporary_grants
            .into_iter()
            .map(|grant| {
                let key = GrantKey::from_uuid(grant.key);
                let permissions =
                    decode_permissions(organization_id, &key.to_string(), grant.permissions);
                Ok(TemporaryGrant::new(
                    key,
                    UserId::new(grant.user_id)?,
                    permissions,
                    grant.expires_at,
                    UserId::new(grant.granted_by)?,
                    grant.reason,
                    grant.granted_at,
                ))
            })
            .collect::<AppResult<Vec<_>>>()
            .map_err(|error| corrupt(organization_id, "temporary_grants", error))?;

        Organization::from_parts(OrganizationParts {
            id: organization_id,
            selector: NonEmptyString::new(header.selector)?,
            name: NonEmptyString::new(header.name)?,
            roles,
            members,
            invites,
            temporary_grants,
            permissions_version: u64::try_from(header.permissions_version)
                .unwrap_or(INITIAL_PERMISSIONS_VERSION),
        })
        .map_err(|error| corrupt(organization_id, "document", error))
    }
}

impl MemberDocument {
    pub(crate) fn from_member(member: &TeamMember) -> Self {
        Self {
            key: member.key().as_str().to_owned(),
            user_id: member.user_id().as_str().to_owned(),
            role_key: member.role_key().as_str().to_owned(),
            joined_at: member.joined_at(),
        }
    }

    pub(crate) fn into_member(self) -> AppResult<TeamMember> {
        Ok(TeamMember::new(
            MemberKey::new(self.key)?,
            UserId::new(self.user_id)?,
            RoleKey::new(self.role_key)?,
            self.joined_at,
        ))
    }
}

fn decode_permissions(
    organization_id: OrganizationId,
    owner: &str,
    keys: Vec<String>,
) -> PermissionSet {
    let (permissions, unknown) = PermissionSet::from_storage_keys(keys);
    if !unknown.is_empty() {
        warn!(
            organization_id = %organization_id,
            owner,
            unknown = ?unknown,
            "ignoring unknown permission keys in storage"
        );
    }
    permissions
}

fn corrupt(organization_id: OrganizationId, section: &str, error: AppError) -> AppError {
    AppError::Internal(format!(
        "organization '{organization_id}' has an invalid {section} section: {error}"
    ))
}
