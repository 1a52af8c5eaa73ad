use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post, put};
use tenantgate_core::AppError;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

mod cors;

/// Builds the HTTP router. The caller adds the session layer.
pub fn build_router(app_state: AppState) -> Result<Router, AppError> {
    let context_routes = Router::new()
        .route(
            "/api/permissions/version",
            get(handlers::permissions::permissions_version_handler),
        )
        .route(
            "/api/permissions/me",
            get(handlers::permissions::my_permissions_handler),
        )
        .route(
            "/api/temporary-grants",
            get(handlers::access::list_temporary_grants_handler)
                .post(handlers::access::create_temporary_grant_handler),
        )
        .route(
            "/api/temporary-grants/cleanup",
            post(handlers::access::cleanup_expired_grants_handler),
        )
        .route(
            "/api/temporary-grants/{grant_key}",
            delete(handlers::access::revoke_temporary_grant_handler),
        )
        .route(
            "/api/api-keys",
            get(handlers::access::list_api_keys_handler)
                .post(handlers::access::create_api_key_handler),
        )
        .route(
            "/api/api-keys/{key_id}",
            delete(handlers::access::revoke_api_key_handler),
        )
        .route(
            "/api/roles",
            get(handlers::team::list_roles_handler).post(handlers::team::create_role_handler),
        )
        .route(
            "/api/roles/{role_key}",
            put(handlers::team::update_role_handler).delete(handlers::team::delete_role_handler),
        )
        .route("/api/members", get(handlers::team::list_members_handler))
        .route(
            "/api/members/{member_key}/role",
            put(handlers::team::update_member_role_handler),
        )
        .route(
            "/api/members/{member_key}",
            delete(handlers::team::remove_member_handler),
        )
        .route(
            "/api/invites",
            get(handlers::team::list_invites_handler).post(handlers::team::create_invite_handler),
        )
        .route(
            "/api/invites/{invite_key}",
            delete(handlers::team::cancel_invite_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_auth,
        ));

    let session_routes = Router::new()
        .route(
            "/api/session/organization",
            put(handlers::session::select_organization_handler),
        )
        .route(
            "/api/organizations",
            post(handlers::team::provision_organization_handler),
        )
        .route(
            "/api/organizations/{organization_id}/invites/{invite_key}/accept",
            post(handlers::team::accept_invite_handler),
        )
        .route_layer(from_fn(middleware::require_session));

    let mut app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(context_routes)
        .merge(session_routes);

    if app_state.dev_session_login {
        app = app.route("/api/dev/session", post(handlers::session::dev_session_handler));
    }

    Ok(app
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_same_origin_for_mutations,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors::build_cors_layer(app_state.frontend_url.as_str())?)
        .with_state(app_state))
}
