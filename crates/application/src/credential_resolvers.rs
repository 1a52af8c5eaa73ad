use std::sync::Arc;

use tenantgate_core::{AppError, AppResult, Clock, UserId, VerifiedSession};
use tenantgate_domain::ApiKeyCredential;
use tracing::{debug, warn};

use crate::ApiKeyRepository;
use crate::token_crypto::{hash_token, is_api_key_token};

/// Extracts the token from a `Bearer` authorization header value.
#[must_use]
pub fn bearer_token(authorization: Option<&str>) -> Option<&str> {
    let value = authorization?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Returns the bearer token when it carries the API key scheme.
#[must_use]
pub fn api_key_token(authorization: Option<&str>) -> Option<&str> {
    bearer_token(authorization).filter(|token| is_api_key_token(token))
}

/// Returns the session user and the active organization selector.
pub fn session_identity(session: Option<&VerifiedSession>) -> AppResult<(&UserId, &str)> {
    let session = session.ok_or(AppError::Unauthenticated)?;
    let selector = session
        .active_organization()
        .ok_or(AppError::NoOrganizationSelected)?;
    Ok((session.user_id(), selector))
}

/// Result of looking up a presented API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeyResolution {
    /// Key matched, is not revoked and has not expired.
    Resolved(ApiKeyCredential),
    /// No key with this secret exists.
    Unknown,
    /// Key exists but was revoked.
    Revoked,
    /// Key exists but has expired.
    Expired,
}

impl ApiKeyResolution {
    /// Converts into the credential or the matching credential error.
    pub fn into_credential(self) -> AppResult<ApiKeyCredential> {
        match self {
            Self::Resolved(credential) => Ok(credential),
            Self::Unknown | Self::Revoked => Err(AppError::InvalidApiKey),
            Self::Expired => Err(AppError::ExpiredApiKey),
        }
    }
}

/// Resolves raw API key tokens against stored hashes.
#[derive(Clone)]
pub struct ApiKeyResolver {
    repository: Arc<dyn ApiKeyRepository>,
    clock: Arc<dyn Clock>,
}

impl ApiKeyResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(repository: Arc<dyn ApiKeyRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Looks up the token by hash and checks revocation and expiry.
    ///
    /// A successful resolution records `last_used_at` in the background;
    /// failures of that write are logged and dropped.
    pub async fn resolve(&self, raw_token: &str) -> AppResult<ApiKeyResolution> {
        if !is_api_key_token(raw_token) {
            return Ok(ApiKeyResolution::Unknown);
        }

        let Some(credential) = self
            .repository
            .find_by_hash(hash_token(raw_token).as_str())
            .await?
        else {
            debug!("api key did not match any stored hash");
            return Ok(ApiKeyResolution::Unknown);
        };

        if credential.is_revoked() {
            debug!(key_id = %credential.id(), "revoked api key presented");
            return Ok(ApiKeyResolution::Revoked);
        }

        let now = self.clock.now();
        if credential.is_expired_at(now) {
            debug!(key_id = %credential.id(), "expired api key presented");
            return Ok(ApiKeyResolution::Expired);
        }

        let repository = Arc::clone(&self.repository);
        let key_id = credential.id();
        tokio::spawn(async move {
            if let Err(error) = repository.touch_last_used(key_id, now).await {
                warn!(error = %error, key_id = %key_id, "failed to record api key usage");
            }
        });

        Ok(ApiKeyResolution::Resolved(credential))
    }
}
