use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use tenantgate_application::{InboundRequest, api_key_token};
use tenantgate_core::{AppError, AppResult, VerifiedSession};
use tower_sessions::Session;

use crate::error::ApiResult;
use crate::state::AppState;

/// Session key holding the identity provider's verified session.
pub const SESSION_IDENTITY_KEY: &str = "tenantgate.session";

/// Resolves the request's authorization context and exposes it as an extension.
pub async fn require_auth(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let inbound = InboundRequest {
        authorization: authorization_header(request.headers()),
        session: read_verified_session(&session).await?,
    };
    let context = state.authorization_service.resolve_context(&inbound).await?;

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Requires a verified session without resolving an organization.
pub async fn require_session(
    session: Session,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let identity = read_verified_session(&session)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

pub async fn require_same_origin_for_mutations(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let headers = request.headers();
    let uses_api_key = api_key_token(authorization_header(headers).as_deref()).is_some();

    if is_state_changing_method(request.method()) && !uses_api_key {
        if let Some(fetch_site) = headers.get("sec-fetch-site")
            && fetch_site == HeaderValue::from_static("cross-site")
        {
            return Err(AppError::Unauthenticated.into());
        }

        let origin = headers
            .get(header::ORIGIN)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let referer = headers
            .get(header::REFERER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        let allowed_origin = state.frontend_url.as_str();
        if origin != allowed_origin && !referer.starts_with(allowed_origin) {
            return Err(AppError::Unauthenticated.into());
        }
    }

    Ok(next.run(request).await)
}

pub async fn read_verified_session(session: &Session) -> AppResult<Option<VerifiedSession>> {
    session
        .get::<VerifiedSession>(SESSION_IDENTITY_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))
}

pub async fn write_verified_session(session: &Session, identity: &VerifiedSession) -> AppResult<()> {
    session
        .insert(SESSION_IDENTITY_KEY, identity)
        .await
        .map_err(|error| AppError::Internal(format!("failed to write session identity: {error}")))
}

fn authorization_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

fn is_state_changing_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}
