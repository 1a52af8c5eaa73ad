//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_api_key_repository;
mod in_memory_context_cache;
mod in_memory_organization_store;
mod organization_document;
mod postgres_api_key_repository;
mod postgres_audit_repository;
mod postgres_organization_store;
mod tracing_audit_repository;

#[cfg(test)]
mod scenario_tests;

pub use in_memory_api_key_repository::InMemoryApiKeyRepository;
pub use in_memory_context_cache::{
    ContextCacheSettings, DEFAULT_CONTEXT_CAPACITY, DEFAULT_CONTEXT_TTL,
    InMemoryOrganizationContextCache,
};
pub use in_memory_organization_store::InMemoryOrganizationStore;
pub use postgres_api_key_repository::PostgresApiKeyRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_organization_store::PostgresOrganizationStore;
pub use tracing_audit_repository::TracingAuditRepository;
