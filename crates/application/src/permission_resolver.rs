//! Pure effective-permission computation over a resolved context.

use chrono::{DateTime, Utc};
use tenantgate_core::{AppError, AppResult};
use tenantgate_domain::{Organization, Permission, PermissionSet, TeamMember};

use crate::{Actor, AuthContext};

/// Computes the effective permissions of the context's actor at `now`.
///
/// Members get their role's permissions plus active temporary grants.
/// Members of the admin role hold the full catalog. An unknown role
/// contributes nothing. API keys hold their fixed permissions until expiry,
/// narrowed to what their creator currently holds; a key whose creator left
/// the organization holds nothing.
#[must_use]
pub fn effective_permissions(context: &AuthContext, now: DateTime<Utc>) -> PermissionSet {
    let organization = context.organization();
    match context.actor() {
        Actor::Member(member) => member_permissions(organization, member, now),
        Actor::ApiKey(key) => {
            if api_key_expired(key.expires_at, now) {
                return PermissionSet::new();
            }

            organization
                .member_for_user(&key.created_by)
                .map(|creator| {
                    key.permissions
                        .intersection(&member_permissions(organization, creator, now))
                })
                .unwrap_or_default()
        }
    }
}

fn member_permissions(
    organization: &Organization,
    member: &TeamMember,
    now: DateTime<Utc>,
) -> PermissionSet {
    if member.role_key().is_admin() {
        return PermissionSet::full();
    }

    let mut permissions = organization
        .role(member.role_key())
        .map(|role| role.permissions().clone())
        .unwrap_or_default();
    for grant in organization.active_grants_for(member.user_id(), now) {
        permissions.extend_from(grant.permissions());
    }
    permissions
}

/// Returns whether the actor holds the permission at `now`.
#[must_use]
pub fn has_permission(context: &AuthContext, permission: Permission, now: DateTime<Utc>) -> bool {
    effective_permissions(context, now).contains(permission)
}

/// Fails with `PermissionDenied` unless the actor holds the permission.
///
/// API keys that expired after the context was resolved fail with
/// `ExpiredApiKey` instead.
pub fn require_permission(
    context: &AuthContext,
    permission: Permission,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if has_permission(context, permission, now) {
        return Ok(());
    }

    if let Actor::ApiKey(key) = context.actor()
        && api_key_expired(key.expires_at, now)
    {
        return Err(AppError::ExpiredApiKey);
    }

    Err(AppError::PermissionDenied {
        permission: permission.as_str().to_owned(),
    })
}

/// Fails with `EscalationDenied` naming the first requested permission the
/// actor does not hold.
pub fn ensure_within_authority(
    context: &AuthContext,
    requested: &PermissionSet,
    now: DateTime<Utc>,
) -> AppResult<()> {
    match effective_permissions(context, now).first_missing(requested) {
        Some(permission) => Err(AppError::EscalationDenied {
            permission: permission.as_str().to_owned(),
        }),
        None => Ok(()),
    }
}

fn api_key_expired(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|expires_at| expires_at <= now)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use tenantgate_core::{AppError, AppResult, NonEmptyString, OrganizationId, UserId};
    use tenantgate_domain::{
        ApiKeyId, MemberKey, Organization, OrganizationPatch, Permission, PermissionSet, Role,
        RoleKey, TeamMember, TemporaryGrant,
    };

    use super::{effective_permissions, ensure_within_authority, has_permission, require_permission};
    use crate::{ApiKeyActor, AuthContext};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    fn organization_with_member(role: &str) -> AppResult<(Organization, TeamMember)> {
        let mut organization = Organization::create(
            OrganizationId::new(),
            NonEmptyString::new("acme")?,
            NonEmptyString::new("Acme")?,
            UserId::new("owner")?,
            now() - Duration::days(30),
        )?;
        let member = TeamMember::new(
            MemberKey::generate(),
            UserId::new("alice")?,
            RoleKey::new(role)?,
            now() - Duration::days(1),
        );
        organization.apply_patch(OrganizationPatch::AppendMember(member.clone()))?;
        Ok((organization, member))
    }

    fn grant(
        organization: &mut Organization,
        permissions: PermissionSet,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let grant = TemporaryGrant::issue(
            UserId::new("alice")?,
            permissions,
            expires_at,
            UserId::new("owner")?,
            None,
            now() - Duration::hours(1),
        )?;
        organization.apply_patch(OrganizationPatch::AppendTemporaryGrant(grant))
    }

    fn key_actor(
        created_by: &str,
        permissions: PermissionSet,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<ApiKeyActor> {
        Ok(ApiKeyActor {
            key_id: ApiKeyId::new(),
            name: "ci".to_owned(),
            created_by: UserId::new(created_by)?,
            permissions,
            expires_at,
        })
    }

    fn api_key_context(expires_at: Option<DateTime<Utc>>) -> AppResult<AuthContext> {
        let (organization, _) = organization_with_member("viewer")?;
        Ok(AuthContext::for_api_key(
            Arc::new(organization),
            key_actor(
                "owner",
                PermissionSet::from([Permission::ViewForms]),
                expires_at,
            )?,
        ))
    }

    fn with_custom_role(
        organization: &mut Organization,
        permissions: PermissionSet,
    ) -> AppResult<()> {
        organization.apply_patch(OrganizationPatch::AppendRole(Role::new(
            RoleKey::new("custom")?,
            NonEmptyString::new("Custom")?,
            "",
            permissions,
            false,
        )))
    }

    #[test]
    fn viewer_role_grants_only_view_permissions() -> AppResult<()> {
        let (organization, member) = organization_with_member("viewer")?;
        let context = AuthContext::for_member(Arc::new(organization), member);

        assert!(has_permission(&context, Permission::ViewForms, now()));
        assert!(!has_permission(&context, Permission::ManageForms, now()));
        Ok(())
    }

    #[test]
    fn admin_role_holds_full_catalog() -> AppResult<()> {
        let (organization, member) = organization_with_member("admin")?;
        let context = AuthContext::for_member(Arc::new(organization), member);

        assert_eq!(effective_permissions(&context, now()), PermissionSet::full());
        Ok(())
    }

    #[test]
    fn unknown_role_fails_closed() -> AppResult<()> {
        let (organization, member) = organization_with_member("ghost")?;
        let context = AuthContext::for_member(Arc::new(organization), member);

        assert!(effective_permissions(&context, now()).is_empty());
        Ok(())
    }

    #[test]
    fn active_grant_extends_role_until_expiry() -> AppResult<()> {
        let (mut organization, member) = organization_with_member("viewer")?;
        let expires_at = now() + Duration::minutes(5);
        grant(
            &mut organization,
            PermissionSet::from([Permission::ManageForms]),
            expires_at,
        )?;
        let context = AuthContext::for_member(Arc::new(organization), member);

        assert!(has_permission(&context, Permission::ManageForms, now()));
        assert!(!has_permission(&context, Permission::ManageForms, expires_at));
        Ok(())
    }

    #[test]
    fn require_permission_names_missing_permission() -> AppResult<()> {
        let (organization, member) = organization_with_member("viewer")?;
        let context = AuthContext::for_member(Arc::new(organization), member);

        let result = require_permission(&context, Permission::ManageRoles, now());
        assert_eq!(
            result,
            Err(AppError::PermissionDenied {
                permission: "manage_roles".to_owned()
            })
        );
        Ok(())
    }

    #[test]
    fn api_key_permissions_lapse_at_expiry() -> AppResult<()> {
        let context = api_key_context(Some(now()))?;

        assert!(effective_permissions(&context, now()).is_empty());
        assert_eq!(
            require_permission(&context, Permission::ViewForms, now()),
            Err(AppError::ExpiredApiKey)
        );

        let unexpired = api_key_context(None)?;
        assert!(require_permission(&unexpired, Permission::ViewForms, now()).is_ok());
        Ok(())
    }

    #[test]
    fn api_key_is_narrowed_to_its_creators_current_permissions() -> AppResult<()> {
        let (mut organization, member) = organization_with_member("editor")?;
        let requested = PermissionSet::from([Permission::ViewForms, Permission::ManageForms]);
        let key = key_actor("alice", requested.clone(), None)?;

        let context = AuthContext::for_api_key(Arc::new(organization.clone()), key.clone());
        assert_eq!(effective_permissions(&context, now()), requested);

        organization.apply_patch(OrganizationPatch::SetMemberRole {
            member_key: member.key().clone(),
            role_key: RoleKey::new("viewer")?,
        })?;
        let demoted = AuthContext::for_api_key(Arc::new(organization.clone()), key.clone());
        assert_eq!(
            effective_permissions(&demoted, now()),
            PermissionSet::from([Permission::ViewForms])
        );
        assert_eq!(
            require_permission(&demoted, Permission::ManageForms, now()),
            Err(AppError::PermissionDenied {
                permission: "manage_forms".to_owned()
            })
        );

        organization.apply_patch(OrganizationPatch::UnsetMember(member.key().clone()))?;
        let orphaned = AuthContext::for_api_key(Arc::new(organization), key);
        assert!(effective_permissions(&orphaned, now()).is_empty());
        Ok(())
    }

    #[test]
    fn creator_grants_flow_into_api_key_until_they_expire() -> AppResult<()> {
        let (mut organization, _) = organization_with_member("viewer")?;
        let expires_at = now() + Duration::minutes(10);
        grant(
            &mut organization,
            PermissionSet::from([Permission::ManageForms]),
            expires_at,
        )?;
        let context = AuthContext::for_api_key(
            Arc::new(organization),
            key_actor("alice", PermissionSet::from([Permission::ManageForms]), None)?,
        );

        assert!(has_permission(&context, Permission::ManageForms, now()));
        assert!(!has_permission(&context, Permission::ManageForms, expires_at));
        Ok(())
    }

    #[test]
    fn authority_check_names_first_missing_permission() -> AppResult<()> {
        let (organization, member) = organization_with_member("editor")?;
        let context = AuthContext::for_member(Arc::new(organization), member);
        let requested = PermissionSet::from([Permission::ManageForms, Permission::ManageRoles]);

        assert_eq!(
            ensure_within_authority(&context, &requested, now()),
            Err(AppError::EscalationDenied {
                permission: "manage_roles".to_owned()
            })
        );
        Ok(())
    }

    proptest! {
        #[test]
        fn subsets_of_held_permissions_never_escalate(
            granted in proptest::sample::subsequence(Permission::all().to_vec(), 0..=Permission::all().len()),
            pick in proptest::collection::vec(any::<bool>(), Permission::all().len()),
        ) {
            let (mut organization, member) = organization_with_member("viewer")
                .map_err(|error| TestCaseError::fail(error.to_string()))?;
            let granted: PermissionSet = granted.into_iter().collect();
            if !granted.is_empty() {
                grant(&mut organization, granted, now() + Duration::hours(1))
                    .map_err(|error| TestCaseError::fail(error.to_string()))?;
            }
            let context = AuthContext::for_member(Arc::new(organization), member);
            let held = effective_permissions(&context, now());
            let requested: PermissionSet = held
                .iter()
                .zip(pick.iter())
                .filter_map(|(permission, keep)| keep.then_some(permission))
                .collect();

            prop_assert!(ensure_within_authority(&context, &requested, now()).is_ok());
        }

        #[test]
        fn role_permissions_are_a_floor_and_exact_without_grants(
            role_permissions in proptest::sample::subsequence(Permission::all().to_vec(), 0..=Permission::all().len()),
            granted in proptest::sample::subsequence(Permission::all().to_vec(), 0..=Permission::all().len()),
            grant_expired in any::<bool>(),
        ) {
            let (mut organization, member) = organization_with_member("custom")
                .map_err(|error| TestCaseError::fail(error.to_string()))?;
            let role_permissions: PermissionSet = role_permissions.into_iter().collect();
            with_custom_role(&mut organization, role_permissions.clone())
                .map_err(|error| TestCaseError::fail(error.to_string()))?;

            let plain = AuthContext::for_member(Arc::new(organization.clone()), member.clone());
            prop_assert_eq!(effective_permissions(&plain, now()), role_permissions.clone());

            let granted: PermissionSet = granted.into_iter().collect();
            if !granted.is_empty() {
                let expires_at = if grant_expired {
                    now() - Duration::minutes(1)
                } else {
                    now() + Duration::hours(1)
                };
                grant(&mut organization, granted.clone(), expires_at)
                    .map_err(|error| TestCaseError::fail(error.to_string()))?;
            }
            let context = AuthContext::for_member(Arc::new(organization), member);
            let effective = effective_permissions(&context, now());

            prop_assert!(effective.is_superset_of(&role_permissions));
            if grant_expired || granted.is_empty() {
                prop_assert_eq!(effective, role_permissions);
            } else {
                prop_assert_eq!(effective, role_permissions.union(&granted));
            }
        }
    }
}
