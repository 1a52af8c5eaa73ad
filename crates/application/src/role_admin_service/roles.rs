use tenantgate_core::NonEmptyString;
use tenantgate_domain::{AuditAction, OrganizationPatch, Permission, Role, RoleKey};

use crate::{AuditEvent, AuthContext};

use super::*;

impl RoleAdminService {
    /// Returns roles of the actor's organization in display order.
    pub async fn list_roles(&self, actor: &AuthContext) -> AppResult<Vec<Role>> {
        if !self.authorization.has_permission(actor, Permission::ManageTeam) {
            self.authorization
                .require_permission(actor, Permission::ManageRoles)?;
        }

        let organization = self.load_organization(actor.organization_id()).await?;
        Ok(organization.roles().cloned().collect())
    }

    /// Creates a custom role whose permissions the actor already holds.
    pub async fn create_role(&self, actor: &AuthContext, input: CreateRoleInput) -> AppResult<Role> {
        self.authorization
            .require_member_permission(actor, Permission::ManageRoles)?;

        let key = RoleKey::new(input.key.trim())?;
        let name = NonEmptyString::new(input.name.trim())?;
        self.authorization
            .ensure_within_authority(actor, &input.permissions)?;

        let role = Role::new(key, name, input.description, input.permissions, false);
        self.invalidator
            .commit(
                actor.organization_id(),
                vec![OrganizationPatch::AppendRole(role.clone())],
            )
            .await?;

        self.audit
            .record(AuditEvent {
                organization_id: actor.organization_id(),
                subject: actor.subject(),
                action: AuditAction::RoleCreated,
                resource_type: "role".to_owned(),
                resource_id: role.key().to_string(),
                detail: Some(format!(
                    "created role '{}' with [{}]",
                    role.key(),
                    role.permissions().storage_keys().join(", ")
                )),
            })
            .await;

        Ok(role)
    }

    /// Updates a role. Added permissions must be within the actor's authority
    /// and the admin role's permissions are fixed.
    pub async fn update_role(
        &self,
        actor: &AuthContext,
        role_key: &RoleKey,
        input: UpdateRoleInput,
    ) -> AppResult<Role> {
        self.authorization
            .require_member_permission(actor, Permission::ManageRoles)?;

        let organization = self.load_organization(actor.organization_id()).await?;
        let current = organization
            .role(role_key)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_key}' does not exist")))?;

        if let Some(permissions) = &input.permissions {
            if role_key.is_admin() {
                return Err(AppError::Conflict(
                    "admin role permissions cannot be changed".to_owned(),
                ));
            }

            let added = permissions
                .iter()
                .filter(|permission| !current.permissions().contains(*permission))
                .collect();
            self.authorization.ensure_within_authority(actor, &added)?;
        }

        let name = input
            .name
            .map(|name| NonEmptyString::new(name.trim()))
            .transpose()?;
        let updated = current.with_changes(name, input.description, input.permissions);
        if &updated == current {
            return Ok(updated);
        }

        self.invalidator
            .commit(
                organization.id(),
                vec![
                    OrganizationPatch::ExpectPermissionsVersion(organization.permissions_version()),
                    OrganizationPatch::SetRole(updated.clone()),
                ],
            )
            .await?;

        self.audit
            .record(AuditEvent {
                organization_id: organization.id(),
                subject: actor.subject(),
                action: AuditAction::RoleUpdated,
                resource_type: "role".to_owned(),
                resource_id: role_key.to_string(),
                detail: Some(format!(
                    "role '{}' now has [{}]",
                    role_key,
                    updated.permissions().storage_keys().join(", ")
                )),
            })
            .await;

        Ok(updated)
    }

    /// Deletes a custom role that no member or invite references.
    pub async fn delete_role(&self, actor: &AuthContext, role_key: &RoleKey) -> AppResult<()> {
        self.authorization
            .require_member_permission(actor, Permission::ManageRoles)?;

        let organization = self.load_organization(actor.organization_id()).await?;
        let role = organization
            .role(role_key)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_key}' does not exist")))?;

        if role.is_system() {
            return Err(AppError::Conflict(format!(
                "system role '{role_key}' cannot be deleted"
            )));
        }

        if organization.is_role_referenced(role_key) {
            return Err(AppError::Conflict(format!(
                "role '{role_key}' is still assigned to members or invites"
            )));
        }

        self.invalidator
            .commit(
                organization.id(),
                vec![
                    OrganizationPatch::ExpectPermissionsVersion(organization.permissions_version()),
                    OrganizationPatch::UnsetRole(role_key.clone()),
                ],
            )
            .await?;

        self.audit
            .record(AuditEvent {
                organization_id: organization.id(),
                subject: actor.subject(),
                action: AuditAction::RoleDeleted,
                resource_type: "role".to_owned(),
                resource_id: role_key.to_string(),
                detail: None,
            })
            .await;

        Ok(())
    }
}
