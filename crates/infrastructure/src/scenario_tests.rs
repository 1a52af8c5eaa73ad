//! End-to-end flows over the in-memory adapters with simulated time.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use tenantgate_application::{
    ApiKeyService, AuditDispatcher, AuthContext, AuthorizationService, CreateApiKeyInput,
    CreateRoleInput, CreateTemporaryGrantInput, InboundRequest, OrganizationStore, PermissionInvalidator,
    RoleAdminService, TemporaryGrantService,
};
use tenantgate_core::{
    AppError, AppResult, Clock, FixedClock, OrganizationId, UserId, VerifiedSession,
};
use tenantgate_domain::{Permission, PermissionSet, RoleKey};

use crate::{
    InMemoryApiKeyRepository, InMemoryOrganizationContextCache, InMemoryOrganizationStore,
    TracingAuditRepository,
};

struct Deployment {
    clock: Arc<FixedClock>,
    store: Arc<InMemoryOrganizationStore>,
    authorization: AuthorizationService,
    grants: TemporaryGrantService,
    roles: RoleAdminService,
    api_keys: ApiKeyService,
    organization_id: OrganizationId,
}

impl Deployment {
    async fn start() -> AppResult<Self> {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
                .single()
                .unwrap_or_default(),
        ));
        let store = Arc::new(InMemoryOrganizationStore::new());
        let cache = Arc::new(InMemoryOrganizationContextCache::default());
        let key_repository = Arc::new(InMemoryApiKeyRepository::new());
        let audit = AuditDispatcher::new(Arc::new(TracingAuditRepository));

        let authorization = AuthorizationService::new(
            store.clone(),
            cache.clone(),
            key_repository.clone(),
            clock.clone(),
        );
        let invalidator = PermissionInvalidator::new(store.clone(), cache);
        let grants = TemporaryGrantService::new(
            authorization.clone(),
            store.clone(),
            invalidator.clone(),
            audit.clone(),
        );
        let roles = RoleAdminService::new(
            authorization.clone(),
            store.clone(),
            invalidator.clone(),
            audit.clone(),
        );
        let api_keys =
            ApiKeyService::new(authorization.clone(), key_repository, invalidator, audit);

        let organization = roles
            .provision_organization(UserId::new("owner")?, "org1", "Org One")
            .await?;
        let deployment = Self {
            clock,
            store,
            authorization,
            grants,
            roles,
            api_keys,
            organization_id: organization.id(),
        };

        let owner = deployment.session("owner").await?;
        let invite = deployment
            .roles
            .invite_member(&owner, "u1@example.com", RoleKey::new("viewer")?)
            .await?;
        deployment
            .roles
            .accept_invite(deployment.organization_id, invite.key(), UserId::new("u1")?)
            .await?;

        Ok(deployment)
    }

    async fn session(&self, user: &str) -> AppResult<AuthContext> {
        self.authorization
            .resolve_context(&InboundRequest {
                authorization: None,
                session: Some(VerifiedSession::new(
                    UserId::new(user)?,
                    Some("org1".to_owned()),
                )),
            })
            .await
    }

    async fn version(&self) -> AppResult<Option<u64>> {
        self.store.permissions_version(self.organization_id).await
    }
}

#[tokio::test]
async fn temporary_grant_lapses_and_is_cleaned_up() -> AppResult<()> {
    let deployment = Deployment::start().await?;
    let owner = deployment.session("owner").await?;

    let before = deployment.session("u1").await?;
    assert!(!deployment
        .authorization
        .has_permission(&before, Permission::ManageForms));

    deployment
        .grants
        .grant(
            &owner,
            CreateTemporaryGrantInput {
                user_id: UserId::new("u1")?,
                permissions: PermissionSet::from([Permission::ManageForms]),
                expires_at: deployment.clock.now() + Duration::hours(1),
                reason: Some("quarterly review".to_owned()),
            },
        )
        .await?;

    let granted = deployment.session("u1").await?;
    assert!(deployment
        .authorization
        .has_permission(&granted, Permission::ManageForms));

    deployment.clock.advance(Duration::hours(2));
    let lapsed = deployment.session("u1").await?;
    assert!(!deployment
        .authorization
        .has_permission(&lapsed, Permission::ManageForms));

    assert_eq!(
        deployment
            .grants
            .cleanup_expired(deployment.organization_id)
            .await?,
        1
    );
    assert_eq!(
        deployment
            .grants
            .cleanup_expired(deployment.organization_id)
            .await?,
        0
    );
    Ok(())
}

#[tokio::test]
async fn owner_reassignment_is_rejected_without_mutation() -> AppResult<()> {
    let deployment = Deployment::start().await?;
    let owner = deployment.session("owner").await?;
    let version_before = deployment.version().await?;
    let owner_key = owner
        .member()
        .map(|member| member.key().clone())
        .ok_or(AppError::NotAMember)?;

    let result = deployment
        .roles
        .update_team_member_role(&owner, &owner_key, RoleKey::new("viewer")?)
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(deployment.version().await?, version_before);
    Ok(())
}

#[tokio::test]
async fn api_key_is_bounded_by_creator_and_revocable() -> AppResult<()> {
    let deployment = Deployment::start().await?;
    let owner = deployment.session("owner").await?;

    let created = deployment
        .api_keys
        .create(
            &owner,
            CreateApiKeyInput {
                name: "deploy bot".to_owned(),
                permissions: PermissionSet::from([Permission::ViewForms]),
                expires_at: None,
            },
        )
        .await?;
    assert!(created.raw_token.starts_with("tgk_"));
    let listed = deployment.api_keys.list(&owner).await?;
    assert_eq!(listed.len(), 1);
    assert!(listed.first().is_some_and(|summary| {
        created.raw_token.starts_with(summary.display_prefix.as_str())
            && summary.display_prefix != created.raw_token
    }));

    let bearer = InboundRequest {
        authorization: Some(format!("Bearer {}", created.raw_token)),
        session: None,
    };
    let key_context = deployment.authorization.resolve_context(&bearer).await?;
    assert!(deployment
        .authorization
        .has_permission(&key_context, Permission::ViewForms));
    assert!(!deployment
        .authorization
        .has_permission(&key_context, Permission::ManageForms));

    deployment.api_keys.revoke(&owner, created.key.id).await?;
    let revoked = deployment.authorization.resolve_context(&bearer).await;
    assert_eq!(revoked.map(|context| context.subject()), Err(AppError::InvalidApiKey));
    Ok(())
}

#[tokio::test]
async fn api_key_loses_what_its_creator_loses() -> AppResult<()> {
    let deployment = Deployment::start().await?;
    let owner = deployment.session("owner").await?;
    deployment
        .roles
        .create_role(
            &owner,
            CreateRoleInput {
                key: "integrator".to_owned(),
                name: "Integrator".to_owned(),
                description: String::new(),
                permissions: PermissionSet::from([
                    Permission::ManageApiKeys,
                    Permission::ManageForms,
                    Permission::ViewForms,
                ]),
            },
        )
        .await?;
    let member_key = deployment
        .session("u1")
        .await?
        .member()
        .map(|member| member.key().clone())
        .ok_or(AppError::NotAMember)?;
    deployment
        .roles
        .update_team_member_role(&owner, &member_key, RoleKey::new("integrator")?)
        .await?;

    let creator = deployment.session("u1").await?;
    let created = deployment
        .api_keys
        .create(
            &creator,
            CreateApiKeyInput {
                name: "form sync".to_owned(),
                permissions: PermissionSet::from([Permission::ManageForms, Permission::ViewForms]),
                expires_at: None,
            },
        )
        .await?;
    let bearer = InboundRequest {
        authorization: Some(format!("Bearer {}", created.raw_token)),
        session: None,
    };
    let key_context = deployment.authorization.resolve_context(&bearer).await?;
    assert!(deployment
        .authorization
        .has_permission(&key_context, Permission::ManageForms));

    deployment
        .roles
        .update_team_member_role(&owner, &member_key, RoleKey::new("viewer")?)
        .await?;
    let demoted = deployment.authorization.resolve_context(&bearer).await?;
    assert!(!deployment
        .authorization
        .has_permission(&demoted, Permission::ManageForms));
    assert!(deployment
        .authorization
        .has_permission(&demoted, Permission::ViewForms));

    deployment
        .roles
        .remove_team_member(&owner, &member_key)
        .await?;
    let orphaned = deployment.authorization.resolve_context(&bearer).await?;
    assert!(deployment
        .authorization
        .all_permissions(&orphaned)
        .is_empty());
    Ok(())
}

#[tokio::test]
async fn role_change_is_visible_on_next_resolution() -> AppResult<()> {
    let deployment = Deployment::start().await?;
    let owner = deployment.session("owner").await?;
    let viewer = deployment.session("u1").await?;
    assert!(!deployment
        .authorization
        .has_permission(&viewer, Permission::ManageForms));

    let member_key = viewer
        .member()
        .map(|member| member.key().clone())
        .ok_or(AppError::NotAMember)?;
    deployment
        .roles
        .update_team_member_role(&owner, &member_key, RoleKey::new("editor")?)
        .await?;

    let promoted = deployment.session("u1").await?;
    assert!(deployment
        .authorization
        .has_permission(&promoted, Permission::ManageForms));
    assert_eq!(
        deployment
            .authorization
            .permissions_version(&promoted)
            .await?,
        promoted.organization().permissions_version()
    );
    Ok(())
}
