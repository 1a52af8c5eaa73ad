use tenantgate_core::{AppError, UserId};
use tracing::{debug, warn};

use crate::credential_resolvers::{api_key_token, session_identity};
use crate::{ApiKeyActor, AuthContext, ContextCacheKey, InboundRequest};

use super::*;

impl AuthorizationService {
    /// Resolves the authorization context of one request.
    ///
    /// API keys take precedence over sessions. Cache hits skip the store;
    /// on a miss the organization snapshot is read once and cached.
    pub async fn resolve_context(&self, request: &InboundRequest) -> AppResult<AuthContext> {
        if let Some(token) = api_key_token(request.authorization.as_deref()) {
            return self.resolve_api_key_context(token).await;
        }

        let (user_id, selector) = session_identity(request.session.as_ref())?;
        self.resolve_session_context(user_id, selector).await
    }

    async fn resolve_session_context(
        &self,
        user_id: &UserId,
        selector: &str,
    ) -> AppResult<AuthContext> {
        let key = ContextCacheKey::for_session(user_id, selector);
        if let Some(context) = self.cached_context(&key).await {
            return Ok(context);
        }

        let organization = self
            .store
            .get_organization_by_selector(selector)
            .await?
            .ok_or(AppError::OrganizationNotFound)?;
        let member = organization
            .member_for_user(user_id)
            .cloned()
            .ok_or(AppError::NotAMember)?;

        let context = AuthContext::for_member(Arc::new(organization), member);
        self.remember_context(key, &context).await;
        Ok(context)
    }

    async fn resolve_api_key_context(&self, raw_token: &str) -> AppResult<AuthContext> {
        let credential = self.api_keys.resolve(raw_token).await?.into_credential()?;

        let key = ContextCacheKey::for_api_key(credential.id(), credential.organization_id());
        if let Some(context) = self.cached_context(&key).await {
            return Ok(context);
        }

        let organization = self
            .store
            .get_organization(credential.organization_id())
            .await?
            .ok_or(AppError::OrganizationNotFound)?;

        let context =
            AuthContext::for_api_key(Arc::new(organization), ApiKeyActor::from(&credential));
        self.remember_context(key, &context).await;
        Ok(context)
    }

    async fn cached_context(&self, key: &ContextCacheKey) -> Option<AuthContext> {
        match self.cache.get(key).await {
            Ok(context) => context,
            Err(error) => {
                warn!(error = %error, cache_key = %key, "context cache read failed");
                None
            }
        }
    }

    async fn remember_context(&self, key: ContextCacheKey, context: &AuthContext) {
        debug!(
            cache_key = %key,
            permissions_version = context.organization().permissions_version(),
            "caching resolved context"
        );
        if let Err(error) = self.cache.insert(key, context.clone()).await {
            warn!(error = %error, "context cache write failed");
        }
    }
}
