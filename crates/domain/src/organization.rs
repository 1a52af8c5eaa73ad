use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tenantgate_core::{AppError, AppResult, NonEmptyString, OrganizationId, UserId};

use crate::grant::{GrantKey, TemporaryGrant};
use crate::membership::{InviteKey, MemberKey, PendingInvite, TeamMember};
use crate::role::{Role, RoleKey, RoleTemplate};

/// Version every organization starts at.
pub const INITIAL_PERMISSIONS_VERSION: u64 = 1;

/// Tenant aggregate: roles, members, invites and temporary grants.
///
/// Keyed collections are insertion-ordered maps. Ordered arrays only exist
/// in the storage representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    id: OrganizationId,
    selector: NonEmptyString,
    name: NonEmptyString,
    roles: IndexMap<RoleKey, Role>,
    members: IndexMap<MemberKey, TeamMember>,
    invites: IndexMap<InviteKey, PendingInvite>,
    temporary_grants: IndexMap<GrantKey, TemporaryGrant>,
    permissions_version: u64,
}

/// Flat field bundle used at the storage boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationParts {
    /// Organization identifier.
    pub id: OrganizationId,
    /// Identity-provider selector for the organization.
    pub selector: NonEmptyString,
    /// Display name.
    pub name: NonEmptyString,
    /// Roles in display order.
    pub roles: Vec<Role>,
    /// Members in join order.
    pub members: Vec<TeamMember>,
    /// Pending invites.
    pub invites: Vec<PendingInvite>,
    /// Temporary grants in issuance order.
    pub temporary_grants: Vec<TemporaryGrant>,
    /// Monotonic permissions version.
    pub permissions_version: u64,
}

/// Targeted mutation applied atomically by the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizationPatch {
    /// Appends a new role; the key must be unused.
    AppendRole(Role),
    /// Replaces an existing role in place.
    SetRole(Role),
    /// Removes a role if present.
    UnsetRole(RoleKey),
    /// Appends a new member; the key must be unused.
    AppendMember(TeamMember),
    /// Moves an existing member to another role.
    SetMemberRole {
        /// Target member.
        member_key: MemberKey,
        /// New role.
        role_key: RoleKey,
    },
    /// Removes a member if present.
    UnsetMember(MemberKey),
    /// Appends a pending invite; the key must be unused.
    AppendInvite(PendingInvite),
    /// Removes a pending invite if present.
    UnsetInvite(InviteKey),
    /// Appends a temporary grant; the key must be unused.
    AppendTemporaryGrant(TemporaryGrant),
    /// Removes a temporary grant if present.
    UnsetTemporaryGrant(GrantKey),
    /// Increments the permissions version by one.
    IncrementPermissionsVersion,
    /// Fails the batch unless the stored version equals the given value.
    ExpectPermissionsVersion(u64),
}

impl OrganizationPatch {
    /// Short label used in logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::AppendRole(_) => "append_role",
            Self::SetRole(_) => "set_role",
            Self::UnsetRole(_) => "unset_role",
            Self::AppendMember(_) => "append_member",
            Self::SetMemberRole { .. } => "set_member_role",
            Self::UnsetMember(_) => "unset_member",
            Self::AppendInvite(_) => "append_invite",
            Self::UnsetInvite(_) => "unset_invite",
            Self::AppendTemporaryGrant(_) => "append_temporary_grant",
            Self::UnsetTemporaryGrant(_) => "unset_temporary_grant",
            Self::IncrementPermissionsVersion => "increment_permissions_version",
            Self::ExpectPermissionsVersion(_) => "expect_permissions_version",
        }
    }
}

impl Organization {
    /// Creates an organization seeded with the default roles and its owner.
    pub fn create(
        id: OrganizationId,
        selector: NonEmptyString,
        name: NonEmptyString,
        owner: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let roles = RoleTemplate::defaults()
            .iter()
            .map(RoleTemplate::to_role)
            .collect::<AppResult<Vec<_>>>()?;
        let owner = TeamMember::new(MemberKey::generate(), owner, RoleKey::admin(), now);

        Self::from_parts(OrganizationParts {
            id,
            selector,
            name,
            roles,
            members: vec![owner],
            invites: Vec::new(),
            temporary_grants: Vec::new(),
            permissions_version: INITIAL_PERMISSIONS_VERSION,
        })
    }

    /// Rebuilds the aggregate from storage values, rejecting duplicate keys.
    pub fn from_parts(parts: OrganizationParts) -> AppResult<Self> {
        let mut organization = Self {
            id: parts.id,
            selector: parts.selector,
            name: parts.name,
            roles: IndexMap::with_capacity(parts.roles.len()),
            members: IndexMap::with_capacity(parts.members.len()),
            invites: IndexMap::with_capacity(parts.invites.len()),
            temporary_grants: IndexMap::with_capacity(parts.temporary_grants.len()),
            permissions_version: parts.permissions_version.max(INITIAL_PERMISSIONS_VERSION),
        };

        for role in parts.roles {
            organization.apply_patch(OrganizationPatch::AppendRole(role))?;
        }
        for member in parts.members {
            organization.apply_patch(OrganizationPatch::AppendMember(member))?;
        }
        for invite in parts.invites {
            organization.apply_patch(OrganizationPatch::AppendInvite(invite))?;
        }
        for grant in parts.temporary_grants {
            organization.apply_patch(OrganizationPatch::AppendTemporaryGrant(grant))?;
        }

        Ok(organization)
    }

    /// Flattens the aggregate into storage values.
    #[must_use]
    pub fn into_parts(self) -> OrganizationParts {
        OrganizationParts {
            id: self.id,
            selector: self.selector,
            name: self.name,
            roles: self.roles.into_values().collect(),
            members: self.members.into_values().collect(),
            invites: self.invites.into_values().collect(),
            temporary_grants: self.temporary_grants.into_values().collect(),
            permissions_version: self.permissions_version,
        }
    }

    /// Returns the organization identifier.
    #[must_use]
    pub fn id(&self) -> OrganizationId {
        self.id
    }

    /// Returns the identity-provider selector.
    #[must_use]
    pub fn selector(&self) -> &str {
        self.selector.as_str()
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the current permissions version.
    #[must_use]
    pub fn permissions_version(&self) -> u64 {
        self.permissions_version
    }

    /// Iterates roles in display order.
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    /// Finds a role by key.
    #[must_use]
    pub fn role(&self, key: &RoleKey) -> Option<&Role> {
        self.roles.get(key)
    }

    /// Iterates members in join order.
    pub fn members(&self) -> impl Iterator<Item = &TeamMember> {
        self.members.values()
    }

    /// Finds a member by key.
    #[must_use]
    pub fn member(&self, key: &MemberKey) -> Option<&TeamMember> {
        self.members.get(key)
    }

    /// Finds the membership entry of a user.
    #[must_use]
    pub fn member_for_user(&self, user_id: &UserId) -> Option<&TeamMember> {
        self.members
            .values()
            .find(|member| member.user_id() == user_id)
    }

    /// Iterates pending invites.
    pub fn invites(&self) -> impl Iterator<Item = &PendingInvite> {
        self.invites.values()
    }

    /// Finds a pending invite by key.
    #[must_use]
    pub fn invite(&self, key: &InviteKey) -> Option<&PendingInvite> {
        self.invites.get(key)
    }

    /// Iterates temporary grants in issuance order, including expired ones.
    pub fn temporary_grants(&self) -> impl Iterator<Item = &TemporaryGrant> {
        self.temporary_grants.values()
    }

    /// Finds a temporary grant by key.
    #[must_use]
    pub fn temporary_grant(&self, key: &GrantKey) -> Option<&TemporaryGrant> {
        self.temporary_grants.get(key)
    }

    /// Iterates grants for `user_id` that are still active at `now`.
    pub fn active_grants_for<'a>(
        &'a self,
        user_id: &'a UserId,
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a TemporaryGrant> + 'a {
        self.temporary_grants
            .values()
            .filter(move |grant| grant.user_id() == user_id && grant.is_active_at(now))
    }

    /// Returns keys of grants whose expiry is at or before `now`.
    #[must_use]
    pub fn expired_grant_keys(&self, now: DateTime<Utc>) -> Vec<GrantKey> {
        self.temporary_grants
            .values()
            .filter(|grant| !grant.is_active_at(now))
            .map(TemporaryGrant::key)
            .collect()
    }

    /// Returns the owner: the earliest-joined member, ties broken by lowest member key.
    #[must_use]
    pub fn owner(&self) -> Option<&TeamMember> {
        self.members.values().min_by(|left, right| {
            left.joined_at()
                .cmp(&right.joined_at())
                .then_with(|| left.key().cmp(right.key()))
        })
    }

    /// Returns whether the member key identifies the owner.
    #[must_use]
    pub fn is_owner(&self, member_key: &MemberKey) -> bool {
        self.owner().is_some_and(|owner| owner.key() == member_key)
    }

    /// Returns whether any member or pending invite references the role.
    #[must_use]
    pub fn is_role_referenced(&self, role_key: &RoleKey) -> bool {
        self.members
            .values()
            .any(|member| member.role_key() == role_key)
            || self
                .invites
                .values()
                .any(|invite| invite.role_key() == role_key)
    }

    /// Applies a batch of patches; either all apply or none do.
    pub fn apply_patches(&mut self, patches: &[OrganizationPatch]) -> AppResult<()> {
        let mut staged = self.clone();
        for patch in patches {
            staged.apply_patch(patch.clone())?;
        }

        *self = staged;
        Ok(())
    }

    /// Applies a single patch.
    ///
    /// Appends fail on duplicate keys and sets fail on missing keys; unsets
    /// of missing keys are no-ops.
    pub fn apply_patch(&mut self, patch: OrganizationPatch) -> AppResult<()> {
        match patch {
            OrganizationPatch::AppendRole(role) => {
                if self.roles.contains_key(role.key()) {
                    return Err(AppError::Conflict(format!(
                        "role '{}' already exists",
                        role.key()
                    )));
                }
                self.roles.insert(role.key().clone(), role);
            }
            OrganizationPatch::SetRole(role) => {
                let slot = self.roles.get_mut(role.key()).ok_or_else(|| {
                    AppError::NotFound(format!("role '{}' does not exist", role.key()))
                })?;
                *slot = role;
            }
            OrganizationPatch::UnsetRole(role_key) => {
                self.roles.shift_remove(&role_key);
            }
            OrganizationPatch::AppendMember(member) => {
                if self.members.contains_key(member.key()) {
                    return Err(AppError::Conflict(format!(
                        "member '{}' already exists",
                        member.key()
                    )));
                }
                self.members.insert(member.key().clone(), member);
            }
            OrganizationPatch::SetMemberRole {
                member_key,
                role_key,
            } => {
                let slot = self.members.get_mut(&member_key).ok_or_else(|| {
                    AppError::NotFound(format!("member '{member_key}' does not exist"))
                })?;
                *slot = slot.with_role(role_key);
            }
            OrganizationPatch::UnsetMember(member_key) => {
                self.members.shift_remove(&member_key);
            }
            OrganizationPatch::AppendInvite(invite) => {
                if self.invites.contains_key(invite.key()) {
                    return Err(AppError::Conflict(format!(
                        "invite '{}' already exists",
                        invite.key()
                    )));
                }
                self.invites.insert(invite.key().clone(), invite);
            }
            OrganizationPatch::UnsetInvite(invite_key) => {
                self.invites.shift_remove(&invite_key);
            }
            OrganizationPatch::AppendTemporaryGrant(grant) => {
                if self.temporary_grants.contains_key(&grant.key()) {
                    return Err(AppError::Conflict(format!(
                        "temporary grant '{}' already exists",
                        grant.key()
                    )));
                }
                self.temporary_grants.insert(grant.key(), grant);
            }
            OrganizationPatch::UnsetTemporaryGrant(grant_key) => {
                self.temporary_grants.shift_remove(&grant_key);
            }
            OrganizationPatch::IncrementPermissionsVersion => {
                self.permissions_version = self.permissions_version.saturating_add(1);
            }
            OrganizationPatch::ExpectPermissionsVersion(expected) => {
                if self.permissions_version != expected {
                    return Err(AppError::Conflict(format!(
                        "organization changed concurrently: expected version {expected}, found {}",
                        self.permissions_version
                    )));
                }
            }
        }

        Ok(())
    }
}
