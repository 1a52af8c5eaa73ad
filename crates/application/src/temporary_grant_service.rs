use std::sync::Arc;

use chrono::{DateTime, Utc};
use tenantgate_core::{AppError, AppResult, OrganizationId, UserId};
use tenantgate_domain::{
    AuditAction, GrantKey, OrganizationPatch, Permission, PermissionSet, TemporaryGrant,
};
use tracing::info;

use crate::{
    AuditDispatcher, AuditEvent, AuthContext, AuthorizationService, OrganizationStore,
    PermissionInvalidator,
};

#[cfg(test)]
mod tests;

/// Attempts before a cleanup racing other writers gives up.
const CLEANUP_ATTEMPTS: usize = 3;

/// Input payload for issuing a temporary grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTemporaryGrantInput {
    /// Member receiving the grant.
    pub user_id: UserId,
    /// Permissions added on top of the member's role.
    pub permissions: PermissionSet,
    /// Instant after which the grant has no effect.
    pub expires_at: DateTime<Utc>,
    /// Optional justification.
    pub reason: Option<String>,
}

/// Application service for time-boxed permission grants.
#[derive(Clone)]
pub struct TemporaryGrantService {
    authorization: AuthorizationService,
    store: Arc<dyn OrganizationStore>,
    invalidator: PermissionInvalidator,
    audit: AuditDispatcher,
}

impl TemporaryGrantService {
    /// Creates a temporary grant service.
    #[must_use]
    pub fn new(
        authorization: AuthorizationService,
        store: Arc<dyn OrganizationStore>,
        invalidator: PermissionInvalidator,
        audit: AuditDispatcher,
    ) -> Self {
        Self {
            authorization,
            store,
            invalidator,
            audit,
        }
    }

    /// Issues a grant to a member of the actor's organization.
    ///
    /// The actor needs `manage_grants` and must already hold every granted
    /// permission.
    pub async fn grant(
        &self,
        actor: &AuthContext,
        input: CreateTemporaryGrantInput,
    ) -> AppResult<TemporaryGrant> {
        let granter = self
            .authorization
            .require_member_permission(actor, Permission::ManageGrants)?;
        self.authorization
            .ensure_within_authority(actor, &input.permissions)?;

        let grant = TemporaryGrant::issue(
            input.user_id,
            input.permissions,
            input.expires_at,
            granter.user_id().clone(),
            input.reason,
            self.authorization.now(),
        )?;

        let organization_id = actor.organization_id();
        if self
            .store
            .get_membership(grant.user_id(), organization_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotAMember);
        }

        self.invalidator
            .commit(
                organization_id,
                vec![OrganizationPatch::AppendTemporaryGrant(grant.clone())],
            )
            .await?;

        self.audit
            .record(AuditEvent {
                organization_id,
                subject: actor.subject(),
                action: AuditAction::TemporaryGrantCreated,
                resource_type: "temporary_grant".to_owned(),
                resource_id: grant.key().to_string(),
                detail: Some(format!(
                    "granted [{}] to '{}' until '{}'",
                    grant.permissions().storage_keys().join(", "),
                    grant.user_id(),
                    grant.expires_at().to_rfc3339()
                )),
            })
            .await;

        Ok(grant)
    }

    /// Revokes a grant. Unknown or already removed grants are a no-op.
    pub async fn revoke(&self, actor: &AuthContext, grant_key: GrantKey) -> AppResult<()> {
        self.authorization
            .require_member_permission(actor, Permission::ManageGrants)?;

        let organization_id = actor.organization_id();
        let organization = self
            .store
            .get_organization(organization_id)
            .await?
            .ok_or(AppError::OrganizationNotFound)?;
        let Some(grant) = organization.temporary_grant(&grant_key).cloned() else {
            return Ok(());
        };

        self.invalidator
            .commit(
                organization_id,
                vec![OrganizationPatch::UnsetTemporaryGrant(grant_key)],
            )
            .await?;

        self.audit
            .record(AuditEvent {
                organization_id,
                subject: actor.subject(),
                action: AuditAction::TemporaryGrantRevoked,
                resource_type: "temporary_grant".to_owned(),
                resource_id: grant_key.to_string(),
                detail: Some(format!("revoked grant of '{}'", grant.user_id())),
            })
            .await;

        Ok(())
    }

    /// Lists grants of the actor's organization, optionally only active ones.
    pub async fn list(
        &self,
        actor: &AuthContext,
        active_only: bool,
    ) -> AppResult<Vec<TemporaryGrant>> {
        self.authorization
            .require_permission(actor, Permission::ManageGrants)?;

        let organization = self
            .store
            .get_organization(actor.organization_id())
            .await?
            .ok_or(AppError::OrganizationNotFound)?;
        let now = self.authorization.now();

        Ok(organization
            .temporary_grants()
            .filter(|grant| !active_only || grant.is_active_at(now))
            .cloned()
            .collect())
    }

    /// Lists the active grants of one user.
    pub async fn list_active(
        &self,
        organization_id: OrganizationId,
        user_id: &UserId,
    ) -> AppResult<Vec<TemporaryGrant>> {
        let organization = self
            .store
            .get_organization(organization_id)
            .await?
            .ok_or(AppError::OrganizationNotFound)?;

        Ok(organization
            .active_grants_for(user_id, self.authorization.now())
            .cloned()
            .collect())
    }

    /// Removes every expired grant of an organization and returns the count.
    ///
    /// Bumps the permissions version only when something was removed. Runs
    /// against the version it read, retrying when another writer got there
    /// first, so concurrent cleanups never double count.
    pub async fn cleanup_expired(&self, organization_id: OrganizationId) -> AppResult<usize> {
        let mut last_conflict = None;

        for _ in 0..CLEANUP_ATTEMPTS {
            let organization = self
                .store
                .get_organization(organization_id)
                .await?
                .ok_or(AppError::OrganizationNotFound)?;
            let expired = organization.expired_grant_keys(self.authorization.now());
            if expired.is_empty() {
                return Ok(0);
            }

            let mut patches = vec![OrganizationPatch::ExpectPermissionsVersion(
                organization.permissions_version(),
            )];
            patches.extend(
                expired
                    .iter()
                    .copied()
                    .map(OrganizationPatch::UnsetTemporaryGrant),
            );

            match self.invalidator.commit(organization_id, patches).await {
                Ok(_) => {
                    info!(
                        organization_id = %organization_id,
                        removed = expired.len(),
                        "removed expired temporary grants"
                    );
                    self.audit
                        .record(AuditEvent {
                            organization_id,
                            subject: "system".to_owned(),
                            action: AuditAction::TemporaryGrantsCleanedUp,
                            resource_type: "temporary_grant".to_owned(),
                            resource_id: organization_id.to_string(),
                            detail: Some(format!("removed {} expired grants", expired.len())),
                        })
                        .await;
                    return Ok(expired.len());
                }
                Err(AppError::Conflict(message)) => last_conflict = Some(message),
                Err(error) => return Err(error),
            }
        }

        Err(AppError::Conflict(last_conflict.unwrap_or_else(|| {
            "expired grant cleanup kept racing concurrent writers".to_owned()
        })))
    }
}
