use std::sync::Arc;

use chrono::{DateTime, Utc};
use tenantgate_core::{AppError, AppResult, Clock, OrganizationId};

use crate::{ApiKeyRepository, ApiKeyResolver, OrganizationContextCache, OrganizationStore};

mod checks;
mod context;


pub use checks::PermissionSnapshot;

/// Application service resolving per-request contexts and answering permission checks.
#[derive(Clone)]
pub struct AuthorizationService {
    store: Arc<dyn OrganizationStore>,
    cache: Arc<dyn OrganizationContextCache>,
    api_keys: ApiKeyResolver,
    clock: Arc<dyn Clock>,
}

impl AuthorizationService {
    /// Creates a new authorization service.
    #[must_use]
    pub fn new(
        store: Arc<dyn OrganizationStore>,
        cache: Arc<dyn OrganizationContextCache>,
        api_key_repository: Arc<dyn ApiKeyRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            cache,
            api_keys: ApiKeyResolver::new(api_key_repository, Arc::clone(&clock)),
            clock,
        }
    }

    /// Returns the current instant of the configured clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Returns the current permissions version of an organization.
    pub async fn permissions_version_of(&self, organization_id: OrganizationId) -> AppResult<u64> {
        self.store
            .permissions_version(organization_id)
            .await?
            .ok_or(AppError::OrganizationNotFound)
    }
}
