use tenantgate_core::UserId;
use tenantgate_domain::{
    AuditAction, InviteKey, MemberKey, OrganizationPatch, PendingInvite, Permission, RoleKey,
    TeamMember,
};

use crate::{AuditEvent, AuthContext};

use super::*;

impl RoleAdminService {
    /// Returns members of the actor's organization in join order.
    pub async fn list_members(&self, actor: &AuthContext) -> AppResult<Vec<TeamMember>> {
        self.authorization
            .require_permission(actor, Permission::ManageTeam)?;

        let organization = self.load_organization(actor.organization_id()).await?;
        Ok(organization.members().cloned().collect())
    }

    /// Returns pending invites of the actor's organization.
    pub async fn list_invites(&self, actor: &AuthContext) -> AppResult<Vec<PendingInvite>> {
        self.authorization
            .require_permission(actor, Permission::ManageTeam)?;

        let organization = self.load_organization(actor.organization_id()).await?;
        Ok(organization.invites().cloned().collect())
    }

    /// Moves a member to another role.
    ///
    /// The owner can only hold the admin role, and actors cannot assign a
    /// role carrying permissions they do not hold.
    pub async fn update_team_member_role(
        &self,
        actor: &AuthContext,
        member_key: &MemberKey,
        role_key: RoleKey,
    ) -> AppResult<TeamMember> {
        self.authorization
            .require_member_permission(actor, Permission::ManageTeam)?;

        let organization = self.load_organization(actor.organization_id()).await?;
        let member = organization
            .member(member_key)
            .ok_or_else(|| AppError::NotFound(format!("member '{member_key}' does not exist")))?;
        let role = organization
            .role(&role_key)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_key}' does not exist")))?;

        if organization.is_owner(member_key) && !role_key.is_admin() {
            return Err(AppError::Conflict(
                "the organization owner must keep the admin role".to_owned(),
            ));
        }

        self.authorization
            .ensure_within_authority(actor, &role.granted_permissions())?;

        if member.role_key() == &role_key {
            return Ok(member.clone());
        }

        let updated = member.with_role(role_key.clone());
        self.invalidator
            .commit(
                organization.id(),
                vec![
                    OrganizationPatch::ExpectPermissionsVersion(organization.permissions_version()),
                    OrganizationPatch::SetMemberRole {
                        member_key: member_key.clone(),
                        role_key: role_key.clone(),
                    },
                ],
            )
            .await?;

        self.audit
            .record(AuditEvent {
                organization_id: organization.id(),
                subject: actor.subject(),
                action: AuditAction::MemberRoleUpdated,
                resource_type: "member".to_owned(),
                resource_id: member_key.to_string(),
                detail: Some(format!(
                    "moved '{}' from '{}' to '{}'",
                    member.user_id(),
                    member.role_key(),
                    role_key
                )),
            })
            .await;

        Ok(updated)
    }

    /// Removes a member along with their temporary grants. The owner cannot be removed.
    pub async fn remove_team_member(
        &self,
        actor: &AuthContext,
        member_key: &MemberKey,
    ) -> AppResult<()> {
        self.authorization
            .require_member_permission(actor, Permission::ManageTeam)?;

        let organization = self.load_organization(actor.organization_id()).await?;
        let member = organization
            .member(member_key)
            .ok_or_else(|| AppError::NotFound(format!("member '{member_key}' does not exist")))?;

        if organization.is_owner(member_key) {
            return Err(AppError::Conflict(
                "the organization owner cannot be removed".to_owned(),
            ));
        }

        let mut patches = vec![
            OrganizationPatch::ExpectPermissionsVersion(organization.permissions_version()),
            OrganizationPatch::UnsetMember(member_key.clone()),
        ];
        patches.extend(
            organization
                .temporary_grants()
                .filter(|grant| grant.user_id() == member.user_id())
                .map(|grant| OrganizationPatch::UnsetTemporaryGrant(grant.key())),
        );
        self.invalidator.commit(organization.id(), patches).await?;

        self.audit
            .record(AuditEvent {
                organization_id: organization.id(),
                subject: actor.subject(),
                action: AuditAction::MemberRemoved,
                resource_type: "member".to_owned(),
                resource_id: member_key.to_string(),
                detail: Some(format!("removed '{}'", member.user_id())),
            })
            .await;

        Ok(())
    }

    /// Records an invite for a role the actor could assign directly.
    pub async fn invite_member(
        &self,
        actor: &AuthContext,
        email: &str,
        role_key: RoleKey,
    ) -> AppResult<PendingInvite> {
        self.authorization
            .require_member_permission(actor, Permission::ManageTeam)?;

        let organization = self.load_organization(actor.organization_id()).await?;
        let role = organization
            .role(&role_key)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_key}' does not exist")))?;
        self.authorization
            .ensure_within_authority(actor, &role.granted_permissions())?;

        let invite = PendingInvite::new(
            InviteKey::generate(),
            email,
            role_key,
            self.authorization.now(),
        )?;
        if organization
            .invites()
            .any(|existing| existing.email() == invite.email())
        {
            return Err(AppError::Conflict(format!(
                "an invite for '{}' is already pending",
                invite.email()
            )));
        }

        self.invalidator
            .commit(
                organization.id(),
                vec![
                    OrganizationPatch::ExpectPermissionsVersion(organization.permissions_version()),
                    OrganizationPatch::AppendInvite(invite.clone()),
                ],
            )
            .await?;

        self.audit
            .record(AuditEvent {
                organization_id: organization.id(),
                subject: actor.subject(),
                action: AuditAction::InviteCreated,
                resource_type: "invite".to_owned(),
                resource_id: invite.key().to_string(),
                detail: Some(format!(
                    "invited '{}' as '{}'",
                    invite.email(),
                    invite.role_key()
                )),
            })
            .await;

        Ok(invite)
    }

    /// Cancels a pending invite. Unknown invites are a no-op.
    pub async fn cancel_invite(&self, actor: &AuthContext, invite_key: &InviteKey) -> AppResult<()> {
        self.authorization
            .require_member_permission(actor, Permission::ManageTeam)?;

        let organization = self.load_organization(actor.organization_id()).await?;
        if organization.invite(invite_key).is_none() {
            return Ok(());
        }

        self.invalidator
            .commit(
                organization.id(),
                vec![OrganizationPatch::UnsetInvite(invite_key.clone())],
            )
            .await?;

        self.audit
            .record(AuditEvent {
                organization_id: organization.id(),
                subject: actor.subject(),
                action: AuditAction::InviteCancelled,
                resource_type: "invite".to_owned(),
                resource_id: invite_key.to_string(),
                detail: None,
            })
            .await;

        Ok(())
    }

    /// Turns a pending invite into a membership for `user_id`.
    pub async fn accept_invite(
        &self,
        organization_id: OrganizationId,
        invite_key: &InviteKey,
        user_id: UserId,
    ) -> AppResult<TeamMember> {
        let organization = self.load_organization(organization_id).await?;
        let invite = organization
            .invite(invite_key)
            .ok_or_else(|| AppError::NotFound(format!("invite '{invite_key}' does not exist")))?;

        if organization.member_for_user(&user_id).is_some() {
            return Err(AppError::Conflict(format!(
                "user '{user_id}' is already a member"
            )));
        }

        let member = TeamMember::new(
            MemberKey::generate(),
            user_id,
            invite.role_key().clone(),
            self.authorization.now(),
        );
        self.invalidator
            .commit(
                organization_id,
                vec![
                    OrganizationPatch::ExpectPermissionsVersion(organization.permissions_version()),
                    OrganizationPatch::UnsetInvite(invite_key.clone()),
                    OrganizationPatch::AppendMember(member.clone()),
                ],
            )
            .await?;

        self.audit
            .record(AuditEvent {
                organization_id,
                subject: format!("user:{}", member.user_id()),
                action: AuditAction::InviteAccepted,
                resource_type: "member".to_owned(),
                resource_id: member.key().to_string(),
                detail: Some(format!("joined as '{}'", member.role_key())),
            })
            .await;

        Ok(member)
    }
}
