//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod api_key;
mod grant;
mod membership;
mod organization;
mod role;
mod security;

pub use api_key::{API_KEY_SCHEME, ApiKeyCredential, ApiKeyCredentialParts, ApiKeyId};
pub use grant::{GrantKey, TemporaryGrant};
pub use membership::{InviteKey, MemberKey, PendingInvite, TeamMember};
pub use organization::{
    INITIAL_PERMISSIONS_VERSION, Organization, OrganizationParts, OrganizationPatch,
};
pub use role::{ADMIN_ROLE_KEY, Role, RoleKey, RoleTemplate};
pub use security::{AuditAction, Permission, PermissionSet};
