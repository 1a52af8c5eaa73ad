use tenantgate_application::{CreateRoleInput, UpdateRoleInput};
use tenantgate_core::{OrganizationId, VerifiedSession};
use tenantgate_domain::{InviteKey, MemberKey, RoleKey};
use tower_sessions::Session;
use uuid::Uuid;

use crate::dto::{
    CreateInviteRequest, CreateRoleRequest, InviteResponse, MemberResponse, OrganizationResponse,
    ProvisionOrganizationRequest, RoleResponse, UpdateMemberRoleRequest, UpdateRoleRequest,
    parse_permissions,
};
use crate::middleware::write_verified_session;

use super::*;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .role_admin_service
        .list_roles(&context)
        .await?
        .iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = state
        .role_admin_service
        .create_role(
            &context,
            CreateRoleInput {
                key: payload.key,
                name: payload.name,
                description: payload.description,
                permissions: parse_permissions(&payload.permissions)?,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(&role))))
}

pub async fn update_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(role_key): Path<String>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let permissions = payload
        .permissions
        .as_deref()
        .map(parse_permissions)
        .transpose()?;
    let role = state
        .role_admin_service
        .update_role(
            &context,
            &RoleKey::new(role_key)?,
            UpdateRoleInput {
                name: payload.name,
                description: payload.description,
                permissions,
            },
        )
        .await?;

    Ok(Json(RoleResponse::from(&role)))
}

pub async fn delete_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(role_key): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .delete_role(&context, &RoleKey::new(role_key)?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_members_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
) -> ApiResult<Json<Vec<MemberResponse>>> {
    let members = state
        .role_admin_service
        .list_members(&context)
        .await?
        .iter()
        .map(MemberResponse::from)
        .collect();

    Ok(Json(members))
}

pub async fn update_member_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(member_key): Path<String>,
    Json(payload): Json<UpdateMemberRoleRequest>,
) -> ApiResult<Json<MemberResponse>> {
    let member = state
        .role_admin_service
        .update_team_member_role(
            &context,
            &MemberKey::new(member_key)?,
            RoleKey::new(payload.role_key)?,
        )
        .await?;

    Ok(Json(MemberResponse::from(&member)))
}

pub async fn remove_member_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(member_key): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .remove_team_member(&context, &MemberKey::new(member_key)?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_invites_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
) -> ApiResult<Json<Vec<InviteResponse>>> {
    let invites = state
        .role_admin_service
        .list_invites(&context)
        .await?
        .iter()
        .map(InviteResponse::from)
        .collect();

    Ok(Json(invites))
}

pub async fn create_invite_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<CreateInviteRequest>,
) -> ApiResult<(StatusCode, Json<InviteResponse>)> {
    let invite = state
        .role_admin_service
        .invite_member(
            &context,
            payload.email.as_str(),
            RoleKey::new(payload.role_key)?,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(InviteResponse::from(&invite))))
}

pub async fn cancel_invite_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(invite_key): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .cancel_invite(&context, &InviteKey::new(invite_key)?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Creates an organization owned by the caller and makes it their active one.
pub async fn provision_organization_handler(
    State(state): State<AppState>,
    session: Session,
    Extension(identity): Extension<VerifiedSession>,
    Json(payload): Json<ProvisionOrganizationRequest>,
) -> ApiResult<(StatusCode, Json<OrganizationResponse>)> {
    let organization = state
        .role_admin_service
        .provision_organization(
            identity.user_id().clone(),
            payload.selector.as_str(),
            payload.name.as_str(),
        )
        .await?;

    let switched = identity.with_active_organization(organization.selector());
    write_verified_session(&session, &switched).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrganizationResponse::from(&organization)),
    ))
}

pub async fn accept_invite_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedSession>,
    Path((organization_id, invite_key)): Path<(Uuid, String)>,
) -> ApiResult<Json<MemberResponse>> {
    let member = state
        .role_admin_service
        .accept_invite(
            OrganizationId::from_uuid(organization_id),
            &InviteKey::new(invite_key)?,
            identity.user_id().clone(),
        )
        .await?;

    Ok(Json(MemberResponse::from(&member)))
}
