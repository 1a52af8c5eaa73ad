use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use tenantgate_core::{AppResult, OrganizationId, UserId};
use tenantgate_domain::ApiKeyId;

use crate::AuthContext;

/// Cache key: `actor_id:organization`.
///
/// The organization component is whatever the credential names: the
/// selector for sessions and the organization id for API keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextCacheKey {
    actor_id: String,
    organization: String,
}

impl ContextCacheKey {
    /// Key for a session actor in the organization named by `selector`.
    #[must_use]
    pub fn for_session(user_id: &UserId, selector: &str) -> Self {
        Self {
            actor_id: format!("user:{user_id}"),
            organization: selector.to_owned(),
        }
    }

    /// Key for an API-key actor.
    #[must_use]
    pub fn for_api_key(key_id: ApiKeyId, organization_id: OrganizationId) -> Self {
        Self {
            actor_id: format!("api_key:{key_id}"),
            organization: organization_id.to_string(),
        }
    }

    /// Returns the actor component.
    #[must_use]
    pub fn actor_id(&self) -> &str {
        self.actor_id.as_str()
    }
}

impl Display for ContextCacheKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}:{}", self.actor_id, self.organization)
    }
}

/// Performance cache of resolved authorization contexts.
///
/// Entries are an optimization only. Every permission-affecting mutation
/// must invalidate explicitly.
#[async_trait]
pub trait OrganizationContextCache: Send + Sync {
    /// Returns an unexpired cached context.
    async fn get(&self, key: &ContextCacheKey) -> AppResult<Option<AuthContext>>;

    /// Stores a context. Contexts built from a version older than the last
    /// noted version of their organization are dropped.
    async fn insert(&self, key: ContextCacheKey, context: AuthContext) -> AppResult<()>;

    /// Removes every entry targeting the organization. Returns the count removed.
    async fn invalidate_organization(&self, organization_id: OrganizationId) -> AppResult<usize>;

    /// Removes every entry of one actor in one organization.
    async fn invalidate_entry(
        &self,
        actor_id: &str,
        organization_id: OrganizationId,
    ) -> AppResult<usize>;

    /// Records the latest committed permissions version of an organization.
    async fn note_version(&self, organization_id: OrganizationId, version: u64) -> AppResult<()>;

    /// Drops every entry.
    async fn clear(&self) -> AppResult<()>;
}
