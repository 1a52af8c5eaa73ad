//! Application services and ports.

#![forbid(unsafe_code)]

mod api_key_service;
mod audit_dispatcher;
mod auth_context;
mod authorization_ports;
mod authorization_service;
mod credential_resolvers;
mod grant_sweeper;
mod invalidation;
pub mod permission_resolver;
mod role_admin_service;
mod temporary_grant_service;
mod token_crypto;

#[cfg(test)]
mod test_support;

pub use api_key_service::{ApiKeyService, ApiKeySummary, CreateApiKeyInput, CreatedApiKey};
pub use audit_dispatcher::AuditDispatcher;
pub use auth_context::{Actor, ApiKeyActor, AuthContext, ContextSource, InboundRequest};
pub use authorization_ports::{
    ApiKeyRepository, AuditEvent, AuditRepository, ContextCacheKey, OrganizationContextCache,
    OrganizationStore,
};
pub use authorization_service::{AuthorizationService, PermissionSnapshot};
pub use credential_resolvers::{
    ApiKeyResolution, ApiKeyResolver, api_key_token, bearer_token, session_identity,
};
pub use grant_sweeper::{GrantSweeper, SweepSummary};
pub use invalidation::PermissionInvalidator;
pub use role_admin_service::{CreateRoleInput, RoleAdminService, UpdateRoleInput};
pub use temporary_grant_service::{CreateTemporaryGrantInput, TemporaryGrantService};
