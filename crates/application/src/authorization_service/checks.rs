use tenantgate_domain::{Permission, PermissionSet, RoleKey, TeamMember};
use tracing::debug;

use crate::{AuthContext, ContextSource, permission_resolver};

use super::*;

/// Effective permission state of the current actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSnapshot {
    /// Organization the snapshot belongs to.
    pub organization_id: OrganizationId,
    /// Prefixed actor identifier.
    pub actor_id: String,
    /// Credential path of the context.
    pub source: ContextSource,
    /// Role key for member actors.
    pub role_key: Option<RoleKey>,
    /// Role display name for member actors.
    pub role_name: Option<String>,
    /// Effective permissions at snapshot time.
    pub permissions: PermissionSet,
    /// Current permissions version of the organization.
    pub permissions_version: u64,
}

impl AuthorizationService {
    /// Returns whether the context's actor currently holds the permission.
    #[must_use]
    pub fn has_permission(&self, context: &AuthContext, permission: Permission) -> bool {
        permission_resolver::has_permission(context, permission, self.now())
    }

    /// Ensures the context's actor holds the permission.
    pub fn require_permission(&self, context: &AuthContext, permission: Permission) -> AppResult<()> {
        permission_resolver::require_permission(context, permission, self.now()).inspect_err(
            |error| {
                debug!(
                    actor_id = %context.subject(),
                    organization_id = %context.organization_id(),
                    permission = permission.as_str(),
                    error = %error,
                    "permission check failed"
                );
            },
        )
    }

    /// Ensures a session member holds the permission and returns the member.
    ///
    /// API-key actors never perform administrative mutations.
    pub fn require_member_permission<'a>(
        &self,
        context: &'a AuthContext,
        permission: Permission,
    ) -> AppResult<&'a TeamMember> {
        self.require_permission(context, permission)?;
        context.member().ok_or_else(|| AppError::PermissionDenied {
            permission: permission.as_str().to_owned(),
        })
    }

    /// Returns every permission the actor currently holds.
    #[must_use]
    pub fn all_permissions(&self, context: &AuthContext) -> PermissionSet {
        permission_resolver::effective_permissions(context, self.now())
    }

    /// Ensures the requested permissions are a subset of the actor's own.
    pub fn ensure_within_authority(
        &self,
        context: &AuthContext,
        requested: &PermissionSet,
    ) -> AppResult<()> {
        permission_resolver::ensure_within_authority(context, requested, self.now())
    }

    /// Returns the current permissions version of the context's organization.
    pub async fn permissions_version(&self, context: &AuthContext) -> AppResult<u64> {
        self.permissions_version_of(context.organization_id()).await
    }

    /// Builds the effective permission snapshot of the actor.
    pub async fn permission_snapshot(&self, context: &AuthContext) -> AppResult<PermissionSnapshot> {
        let permissions_version = self.permissions_version(context).await?;
        let role = context.role();

        Ok(PermissionSnapshot {
            organization_id: context.organization_id(),
            actor_id: context.subject(),
            source: context.source(),
            role_key: context.member().map(|member| member.role_key().clone()),
            role_name: role.map(|role| role.name().to_owned()),
            permissions: self.all_permissions(context),
            permissions_version,
        })
    }
}
