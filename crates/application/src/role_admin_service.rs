use std::sync::Arc;

use tenantgate_core::{AppError, AppResult, OrganizationId};
use tenantgate_domain::{Organization, PermissionSet};

use crate::{AuditDispatcher, AuthorizationService, OrganizationStore, PermissionInvalidator};

mod members;
mod provisioning;
mod roles;


/// Input payload for creating custom roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Unique role key in organization scope.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Static permissions of the role.
    pub permissions: PermissionSet,
}

/// Partial update of a role. Absent fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRoleInput {
    /// New display name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// Replacement permission set.
    pub permissions: Option<PermissionSet>,
}

/// Application service for roles, members and invites.
#[derive(Clone)]
pub struct RoleAdminService {
    authorization: AuthorizationService,
    store: Arc<dyn OrganizationStore>,
    invalidator: PermissionInvalidator,
    audit: AuditDispatcher,
}

impl RoleAdminService {
    /// Creates a role administration service.
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

    async fn load_organization(&self, organization_id: OrganizationId) -> AppResult<Organization> {
        self.store
            .get_organization(organization_id)
            .await?
            .ok_or(AppError::OrganizationNotFound)
    }
}
