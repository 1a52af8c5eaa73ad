use tenantgate_application::{
    ApiKeyService, AuthorizationService, RoleAdminService, TemporaryGrantService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub authorization_service: AuthorizationService,
    pub temporary_grant_service: TemporaryGrantService,
    pub api_key_service: ApiKeyService,
    pub role_admin_service: RoleAdminService,
    pub frontend_url: String,
    pub dev_session_login: bool,
}
