use tenantgate_core::{AppError, NonEmptyString, UserId, VerifiedSession};
use tower_sessions::Session;
use tracing::info;

use crate::dto::{DevSessionRequest, SelectOrganizationRequest};
use crate::middleware::write_verified_session;

use super::*;

/// Switches the organization subsequent requests resolve against.
///
/// Membership is checked when the next request resolves its context.
pub async fn select_organization_handler(
    session: Session,
    Extension(identity): Extension<VerifiedSession>,
    Json(payload): Json<SelectOrganizationRequest>,
) -> ApiResult<StatusCode> {
    let selector = NonEmptyString::new(payload.selector.trim())?;
    let updated = identity.with_active_organization(selector.as_str());
    write_verified_session(&session, &updated).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Stands in for the identity provider in local development.
pub async fn dev_session_handler(
    session: Session,
    Json(payload): Json<DevSessionRequest>,
) -> ApiResult<StatusCode> {
    let identity = VerifiedSession::new(UserId::new(payload.user_id)?, payload.organization);

    session.cycle_id().await.map_err(|error| {
        AppError::Internal(format!("failed to rotate session id: {error}"))
    })?;
    write_verified_session(&session, &identity).await?;
    info!(user_id = %identity.user_id(), "development session issued");

    Ok(StatusCode::NO_CONTENT)
}
