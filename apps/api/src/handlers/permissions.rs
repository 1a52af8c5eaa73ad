use crate::dto::{PermissionSnapshotResponse, PermissionsVersionResponse};

use super::*;

/// Lets clients poll for permission changes without refetching the snapshot.
pub async fn permissions_version_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
) -> ApiResult<Json<PermissionsVersionResponse>> {
    let version = state
        .authorization_service
        .permissions_version(&context)
        .await?;

    Ok(Json(PermissionsVersionResponse { version }))
}

pub async fn my_permissions_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
) -> ApiResult<Json<PermissionSnapshotResponse>> {
    let snapshot = state
        .authorization_service
        .permission_snapshot(&context)
        .await?;

    Ok(Json(PermissionSnapshotResponse::from(snapshot)))
}
