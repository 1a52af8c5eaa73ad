use std::sync::Arc;

use chrono::Duration;
use tenantgate_core::{AppError, AppResult, Clock, UserId};
use tenantgate_domain::{AuditAction, GrantKey, Permission, PermissionSet};

use crate::test_support::{FakeAuditRepository, Harness};

use super::CreateTemporaryGrantInput;

fn grant_input(
    user: &str,
    permissions: PermissionSet,
    harness: &Harness,
    minutes: i64,
) -> AppResult<CreateTemporaryGrantInput> {
    Ok(CreateTemporaryGrantInput {
        user_id: UserId::new(user)?,
        permissions,
        expires_at: harness.clock.now() + Duration::minutes(minutes),
        reason: Some("  incident 42 ".to_owned()),
    })
}

#[tokio::test]
async fn grant_takes_effect_on_next_resolution_and_bumps_version() -> AppResult<()> {
    let harness = Harness::new().await?;
    let owner = harness.context_for("owner").await?;
    let before = harness.context_for("viewer").await?;
    assert!(!harness.authorization.has_permission(&before, Permission::ManageForms));

    let grant = harness
        .grants()
        .grant(
            &owner,
            grant_input(
                "viewer",
                PermissionSet::from([Permission::ManageForms]),
                &harness,
                30,
            )?,
        )
        .await?;

    assert_eq!(grant.reason(), Some("incident 42"));
    assert_eq!(grant.granted_by().as_str(), "owner");
    assert_eq!(harness.version().await?, 2);

    let after = harness.context_for("viewer").await?;
    assert!(harness.authorization.has_permission(&after, Permission::ManageForms));

    let events = harness.audit.events.lock().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::TemporaryGrantCreated);
    assert_eq!(events[0].subject, "user:owner");
    Ok(())
}

#[tokio::test]
async fn grant_lapses_at_expiry_without_any_mutation() -> AppResult<()> {
    let harness = Harness::new().await?;
    let owner = harness.context_for("owner").await?;
    harness
        .grants()
        .grant(
            &owner,
            grant_input(
                "viewer",
                PermissionSet::from([Permission::ManageForms]),
                &harness,
                5,
            )?,
        )
        .await?;
    let context = harness.context_for("viewer").await?;
    let version = harness.version().await?;

    harness.clock.advance(Duration::minutes(5) - Duration::milliseconds(1));
    assert!(harness.authorization.has_permission(&context, Permission::ManageForms));

    harness.clock.advance(Duration::milliseconds(1));
    assert!(!harness.authorization.has_permission(&context, Permission::ManageForms));
    let cached = harness.context_for("viewer").await?;
    assert!(!harness.authorization.has_permission(&cached, Permission::ManageForms));
    assert_eq!(harness.version().await?, version);
    Ok(())
}

#[tokio::test]
async fn grant_requires_manage_grants() -> AppResult<()> {
    let harness = Harness::new().await?;
    let viewer = harness.context_for("viewer").await?;

    let result = harness
        .grants()
        .grant(
            &viewer,
            grant_input("editor", PermissionSet::from([Permission::ViewForms]), &harness, 5)?,
        )
        .await;

    assert_eq!(
        result.map(|grant| grant.key()),
        Err(AppError::PermissionDenied {
            permission: "manage_grants".to_owned()
        })
    );
    assert_eq!(harness.version().await?, 1);
    Ok(())
}

#[tokio::test]
async fn granter_cannot_hand_out_permissions_they_lack() -> AppResult<()> {
    let harness = Harness::new().await?;
    let owner = harness.context_for("owner").await?;
    harness
        .grants()
        .grant(
            &owner,
            grant_input("editor", PermissionSet::from([Permission::ManageGrants]), &harness, 60)?,
        )
        .await?;
    let editor = harness.context_for("editor").await?;

    let result = harness
        .grants()
        .grant(
            &editor,
            grant_input(
                "viewer",
                PermissionSet::from([Permission::ManageForms, Permission::ManageRoles]),
                &harness,
                60,
            )?,
        )
        .await;

    assert_eq!(
        result.map(|grant| grant.key()),
        Err(AppError::EscalationDenied {
            permission: "manage_roles".to_owned()
        })
    );
    assert_eq!(harness.version().await?, 2);
    Ok(())
}

#[tokio::test]
async fn grant_validates_window_permissions_and_target() -> AppResult<()> {
    let harness = Harness::new().await?;
    let owner = harness.context_for("owner").await?;
    let grants = harness.grants();

    let past = grants
        .grant(
            &owner,
            grant_input("viewer", PermissionSet::from([Permission::ManageForms]), &harness, 0)?,
        )
        .await;
    assert!(matches!(past, Err(AppError::InvalidGrantWindow(_))));

    let empty = grants
        .grant(&owner, grant_input("viewer", PermissionSet::new(), &harness, 5)?)
        .await;
    assert!(matches!(empty, Err(AppError::Validation(_))));

    let stranger = grants
        .grant(
            &owner,
            grant_input("mallory", PermissionSet::from([Permission::ViewForms]), &harness, 5)?,
        )
        .await;
    assert_eq!(stranger.map(|grant| grant.key()), Err(AppError::NotAMember));
    assert_eq!(harness.version().await?, 1);
    Ok(())
}

#[tokio::test]
async fn revoke_is_idempotent() -> AppResult<()> {
    let harness = Harness::new().await?;
    let owner = harness.context_for("owner").await?;
    let grants = harness.grants();
    let grant = grants
        .grant(
            &owner,
            grant_input("viewer", PermissionSet::from([Permission::ManageForms]), &harness, 30)?,
        )
        .await?;

    grants.revoke(&owner, grant.key()).await?;
    assert_eq!(harness.version().await?, 3);
    let viewer = harness.context_for("viewer").await?;
    assert!(!harness.authorization.has_permission(&viewer, Permission::ManageForms));

    grants.revoke(&owner, grant.key()).await?;
    grants.revoke(&owner, GrantKey::generate()).await?;
    assert_eq!(harness.version().await?, 3);
    Ok(())
}

#[tokio::test]
async fn list_filters_active_grants() -> AppResult<()> {
    let harness = Harness::new().await?;
    let owner = harness.context_for("owner").await?;
    let grants = harness.grants();
    for minutes in [5, 60] {
        grants
            .grant(
                &owner,
                grant_input("viewer", PermissionSet::from([Permission::ViewForms]), &harness, minutes)?,
            )
            .await?;
    }
    harness.clock.advance(Duration::minutes(10));

    assert_eq!(grants.list(&owner, false).await?.len(), 2);
    assert_eq!(grants.list(&owner, true).await?.len(), 1);
    assert_eq!(
        grants
            .list_active(harness.organization_id, &UserId::new("viewer")?)
            .await?
            .len(),
        1
    );
    Ok(())
}

#[tokio::test]
async fn cleanup_removes_expired_grants_and_bumps_once() -> AppResult<()> {
    let harness = Harness::new().await?;
    let owner = harness.context_for("owner").await?;
    let grants = harness.grants();
    for (user, minutes) in [("viewer", 5), ("editor", 5), ("viewer", 120)] {
        grants
            .grant(
                &owner,
                grant_input(user, PermissionSet::from([Permission::ViewForms]), &harness, minutes)?,
            )
            .await?;
    }
    let version = harness.version().await?;
    harness.clock.advance(Duration::minutes(6));

    assert_eq!(grants.cleanup_expired(harness.organization_id).await?, 2);
    assert_eq!(harness.version().await?, version + 1);

    assert_eq!(grants.cleanup_expired(harness.organization_id).await?, 0);
    assert_eq!(harness.version().await?, version + 1);

    let remaining = harness
        .store
        .snapshot(harness.organization_id)
        .await
        .map(|organization| organization.temporary_grants().count());
    assert_eq!(remaining, Some(1));
    Ok(())
}

#[tokio::test]
async fn audit_failure_does_not_fail_the_mutation() -> AppResult<()> {
    let harness = Harness::with_audit(Arc::new(FakeAuditRepository::failing())).await?;
    let owner = harness.context_for("owner").await?;

    let result = harness
        .grants()
        .grant(
            &owner,
            grant_input("viewer", PermissionSet::from([Permission::ViewForms]), &harness, 5)?,
        )
        .await;

    assert!(result.is_ok());
    assert_eq!(harness.version().await?, 2);
    Ok(())
}
