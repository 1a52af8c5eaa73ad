use std::sync::Arc;

use chrono::{DateTime, Utc};
use tenantgate_core::{OrganizationId, UserId, VerifiedSession};
use tenantgate_domain::{ApiKeyCredential, ApiKeyId, Organization, PermissionSet, Role, TeamMember};

use crate::ContextCacheKey;

/// Credentials extracted from one inbound request by the transport layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundRequest {
    /// Raw `Authorization` header value.
    pub authorization: Option<String>,
    /// Identity verified by the session layer.
    pub session: Option<VerifiedSession>,
}

/// Credential path a context was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    /// Interactive session.
    Session,
    /// Bearer API key.
    ApiKey,
}

impl ContextSource {
    /// Stable label used in responses and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::ApiKey => "api_key",
        }
    }
}

/// Synthetic actor standing in for an API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyActor {
    /// Key identifier.
    pub key_id: ApiKeyId,
    /// Key display name.
    pub name: String,
    /// User who created the key.
    pub created_by: UserId,
    /// Permissions fixed at key creation.
    pub permissions: PermissionSet,
    /// Optional key expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&ApiKeyCredential> for ApiKeyActor {
    fn from(credential: &ApiKeyCredential) -> Self {
        Self {
            key_id: credential.id(),
            name: credential.name().to_owned(),
            created_by: credential.created_by().clone(),
            permissions: credential.permissions().clone(),
            expires_at: credential.expires_at(),
        }
    }
}

/// Authenticated principal of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// Organization member acting through a session.
    Member(TeamMember),
    /// API key acting on behalf of its organization.
    ApiKey(ApiKeyActor),
}

impl Actor {
    /// Stable actor identifier, prefixed by actor kind.
    #[must_use]
    pub fn actor_id(&self) -> String {
        match self {
            Self::Member(member) => format!("user:{}", member.user_id()),
            Self::ApiKey(key) => format!("api_key:{}", key.key_id),
        }
    }
}

/// Per-request authorization context.
///
/// The organization snapshot is shared and never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    organization: Arc<Organization>,
    actor: Actor,
    source: ContextSource,
}

impl AuthContext {
    /// Builds a session context for a member.
    #[must_use]
    pub fn for_member(organization: Arc<Organization>, member: TeamMember) -> Self {
        Self {
            organization,
            actor: Actor::Member(member),
            source: ContextSource::Session,
        }
    }

    /// Builds an API-key context.
    #[must_use]
    pub fn for_api_key(organization: Arc<Organization>, key: ApiKeyActor) -> Self {
        Self {
            organization,
            actor: Actor::ApiKey(key),
            source: ContextSource::ApiKey,
        }
    }

    /// Returns the organization snapshot.
    #[must_use]
    pub fn organization(&self) -> &Organization {
        self.organization.as_ref()
    }

    /// Returns the organization id.
    #[must_use]
    pub fn organization_id(&self) -> OrganizationId {
        self.organization.id()
    }

    /// Returns the actor.
    #[must_use]
    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Returns the credential path.
    #[must_use]
    pub fn source(&self) -> ContextSource {
        self.source
    }

    /// Returns the member when the actor is a session user.
    #[must_use]
    pub fn member(&self) -> Option<&TeamMember> {
        match &self.actor {
            Actor::Member(member) => Some(member),
            Actor::ApiKey(_) => None,
        }
    }

    /// Returns the role of a member actor as found in the snapshot.
    #[must_use]
    pub fn role(&self) -> Option<&Role> {
        self.member()
            .and_then(|member| self.organization.role(member.role_key()))
    }

    /// Returns the audit subject for the actor.
    #[must_use]
    pub fn subject(&self) -> String {
        self.actor.actor_id()
    }

    /// Returns the cache key this context is stored under.
    #[must_use]
    pub fn cache_key(&self) -> ContextCacheKey {
        match &self.actor {
            Actor::Member(member) => {
                ContextCacheKey::for_session(member.user_id(), self.organization.selector())
            }
            Actor::ApiKey(key) => ContextCacheKey::for_api_key(key.key_id, self.organization.id()),
        }
    }
}
