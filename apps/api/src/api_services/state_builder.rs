use std::sync::Arc;

use sqlx::PgPool;
use tenantgate_application::{
    ApiKeyRepository, ApiKeyService, AuditDispatcher, AuditRepository, AuthorizationService,
    OrganizationStore, PermissionInvalidator, RoleAdminService, TemporaryGrantService,
};
use tenantgate_core::{Clock, SystemClock};
use tenantgate_infrastructure::{
    ContextCacheSettings, InMemoryApiKeyRepository, InMemoryOrganizationContextCache,
    InMemoryOrganizationStore, PostgresApiKeyRepository, PostgresAuditRepository,
    PostgresOrganizationStore, TracingAuditRepository,
};

use crate::state::AppState;

/// Storage adapters backing the services.
#[derive(Clone)]
pub struct StoreAdapters {
    pub organizations: Arc<dyn OrganizationStore>,
    pub api_keys: Arc<dyn ApiKeyRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

impl StoreAdapters {
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            organizations: Arc::new(PostgresOrganizationStore::new(pool.clone())),
            api_keys: Arc::new(PostgresApiKeyRepository::new(pool.clone())),
            audit: Arc::new(PostgresAuditRepository::new(pool.clone())),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            organizations: Arc::new(InMemoryOrganizationStore::new()),
            api_keys: Arc::new(InMemoryApiKeyRepository::new()),
            audit: Arc::new(TracingAuditRepository),
        }
    }
}

pub fn build_app_state(
    adapters: StoreAdapters,
    cache_settings: ContextCacheSettings,
    clock: Arc<dyn Clock>,
    frontend_url: String,
    dev_session_login: bool,
) -> AppState {
    let cache = Arc::new(InMemoryOrganizationContextCache::new(cache_settings));
    let authorization_service = AuthorizationService::new(
        adapters.organizations.clone(),
        cache.clone(),
        adapters.api_keys.clone(),
        clock,
    );
    let invalidator = PermissionInvalidator::new(adapters.organizations.clone(), cache);
    let audit = AuditDispatcher::new(adapters.audit);

    AppState {
        temporary_grant_service: TemporaryGrantService::new(
            authorization_service.clone(),
            adapters.organizations.clone(),
            invalidator.clone(),
            audit.clone(),
        ),
        api_key_service: ApiKeyService::new(
            authorization_service.clone(),
            adapters.api_keys,
            invalidator.clone(),
            audit.clone(),
        ),
        role_admin_service: RoleAdminService::new(
            authorization_service.clone(),
            adapters.organizations,
            invalidator,
            audit,
        ),
        authorization_service,
        frontend_url,
        dev_session_login,
    }
}

/// Wall clock used outside tests.
pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}
