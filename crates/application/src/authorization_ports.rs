mod api_keys;
mod audit;
mod cache;
mod store;

pub use api_keys::ApiKeyRepository;
pub use audit::{AuditEvent, AuditRepository};
pub use cache::{ContextCacheKey, OrganizationContextCache};
pub use store::OrganizationStore;
