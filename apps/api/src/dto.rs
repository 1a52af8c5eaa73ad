mod access;
mod common;
mod team;

pub use access::{
    ApiKeyResponse, CleanupResponse, CreateApiKeyRequest, CreateTemporaryGrantRequest,
    CreatedApiKeyResponse, TemporaryGrantListQuery, TemporaryGrantResponse,
};
pub use common::{
    DevSessionRequest, HealthResponse, PermissionSnapshotResponse, PermissionsVersionResponse,
    SelectOrganizationRequest, parse_permissions, parse_timestamp,
};
pub use team::{
    CreateInviteRequest, CreateRoleRequest, InviteResponse, MemberResponse,
    OrganizationResponse, ProvisionOrganizationRequest, RoleResponse, UpdateMemberRoleRequest,
    UpdateRoleRequest,
};
