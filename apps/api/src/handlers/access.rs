use tenantgate_application::{CreateApiKeyInput, CreateTemporaryGrantInput};
use tenantgate_core::UserId;
use tenantgate_domain::{ApiKeyId, GrantKey, Permission};

use crate::dto::{
    ApiKeyResponse, CleanupResponse, CreateApiKeyRequest, CreateTemporaryGrantRequest,
    CreatedApiKeyResponse, TemporaryGrantListQuery, TemporaryGrantResponse, parse_permissions,
    parse_timestamp,
};

use super::*;

pub async fn create_temporary_grant_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<CreateTemporaryGrantRequest>,
) -> ApiResult<(StatusCode, Json<TemporaryGrantResponse>)> {
    let input = CreateTemporaryGrantInput {
        user_id: UserId::new(payload.user_id)?,
        permissions: parse_permissions(&payload.permissions)?,
        expires_at: parse_timestamp("expires_at", payload.expires_at.as_str())?,
        reason: payload.reason.filter(|reason| !reason.trim().is_empty()),
    };

    let grant = state
        .temporary_grant_service
        .grant(&context, input)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TemporaryGrantResponse::from_grant(
            &grant,
            state.authorization_service.now(),
        )),
    ))
}

pub async fn list_temporary_grants_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Query(query): Query<TemporaryGrantListQuery>,
) -> ApiResult<Json<Vec<TemporaryGrantResponse>>> {
    let now = state.authorization_service.now();
    let grants = state
        .temporary_grant_service
        .list(&context, query.active_only.unwrap_or(false))
        .await?
        .iter()
        .map(|grant| TemporaryGrantResponse::from_grant(grant, now))
        .collect();

    Ok(Json(grants))
}

pub async fn revoke_temporary_grant_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(grant_key): Path<String>,
) -> ApiResult<StatusCode> {
    let grant_key = GrantKey::parse(grant_key.as_str())?;
    state
        .temporary_grant_service
        .revoke(&context, grant_key)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn cleanup_expired_grants_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
) -> ApiResult<Json<CleanupResponse>> {
    state
        .authorization_service
        .require_permission(&context, Permission::ManageGrants)?;

    let removed = state
        .temporary_grant_service
        .cleanup_expired(context.organization_id())
        .await?;

    Ok(Json(CleanupResponse { removed }))
}

pub async fn create_api_key_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<CreateApiKeyRequest>,
) -> ApiResult<(StatusCode, Json<CreatedApiKeyResponse>)> {
    let input = CreateApiKeyInput {
        name: payload.name,
        permissions: parse_permissions(&payload.permissions)?,
        expires_at: payload
            .expires_at
            .as_deref()
            .map(|value| parse_timestamp("expires_at", value))
            .transpose()?,
    };

    let created = state.api_key_service.create(&context, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedApiKeyResponse::from(created)),
    ))
}

pub async fn list_api_keys_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
) -> ApiResult<Json<Vec<ApiKeyResponse>>> {
    let keys = state
        .api_key_service
        .list(&context)
        .await?
        .into_iter()
        .map(ApiKeyResponse::from)
        .collect();

    Ok(Json(keys))
}

pub async fn revoke_api_key_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(key_id): Path<String>,
) -> ApiResult<StatusCode> {
    let key_id = ApiKeyId::parse(key_id.as_str())?;
    state.api_key_service.revoke(&context, key_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
