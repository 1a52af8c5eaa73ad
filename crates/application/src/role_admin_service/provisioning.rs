use tenantgate_core::{NonEmptyString, UserId};
use tenantgate_domain::AuditAction;
use tracing::info;

use crate::AuditEvent;

use super::*;

impl RoleAdminService {
    /// Creates an organization seeded with the default roles and `owner` as admin.
    pub async fn provision_organization(
        &self,
        owner: UserId,
        selector: &str,
        name: &str,
    ) -> AppResult<Organization> {
        let selector = NonEmptyString::new(selector.trim())?;
        if self
            .store
            .get_organization_by_selector(selector.as_str())
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "organization '{}' already exists",
                selector.as_str()
            )));
        }

        let organization = Organization::create(
            OrganizationId::new(),
            selector,
            NonEmptyString::new(name.trim())?,
            owner.clone(),
            self.authorization.now(),
        )?;
        self.store.insert_organization(organization.clone()).await?;

        info!(
            organization_id = %organization.id(),
            selector = organization.selector(),
            "provisioned organization"
        );
        self.audit
            .record(AuditEvent {
                organization_id: organization.id(),
                subject: format!("user:{owner}"),
                action: AuditAction::OrganizationProvisioned,
                resource_type: "organization".to_owned(),
                resource_id: organization.id().to_string(),
                detail: Some(format!("provisioned '{}'", organization.selector())),
            })
            .await;

        Ok(organization)
    }
}
