use serde::{Deserialize, Serialize};
use tenantgate_domain::{Organization, PendingInvite, Role, TeamMember};
use ts_rs::TS;

/// Incoming payload for role creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-role-request.ts"
)]
pub struct CreateRoleRequest {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub permissions: Vec<String>,
}

/// Partial role update. Absent fields are left unchanged.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/update-role-request.ts"
)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

/// API representation of a role.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub key: String,
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
    pub is_system: bool,
}

impl From<&Role> for RoleResponse {
    fn from(value: &Role) -> Self {
        Self {
            key: value.key().to_string(),
            name: value.name().to_owned(),
            description: value.description().to_owned(),
            permissions: value.permissions().storage_keys(),
            is_system: value.is_system(),
        }
    }
}

/// API representation of a team member.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/member-response.ts"
)]
pub struct MemberResponse {
    pub key: String,
    pub user_id: String,
    pub role_key: String,
    pub joined_at: String,
}

impl From<&TeamMember> for MemberResponse {
    fn from(value: &TeamMember) -> Self {
        Self {
            key: value.key().to_string(),
            user_id: value.user_id().to_string(),
            role_key: value.role_key().to_string(),
            joined_at: value.joined_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/update-member-role-request.ts"
)]
pub struct UpdateMemberRoleRequest {
    pub role_key: String,
}

#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-invite-request.ts"
)]
pub struct CreateInviteRequest {
    pub email: String,
    pub role_key: String,
}

/// API representation of a pending invite.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/invite-response.ts"
)]
pub struct InviteResponse {
    pub key: String,
    pub email: String,
    pub role_key: String,
    pub invited_at: String,
}

impl From<&PendingInvite> for InviteResponse {
    fn from(value: &PendingInvite) -> Self {
        Self {
            key: value.key().to_string(),
            email: value.email().to_owned(),
            role_key: value.role_key().to_string(),
            invited_at: value.invited_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/provision-organization-request.ts"
)]
pub struct ProvisionOrganizationRequest {
    pub selector: String,
    pub name: String,
}

/// API representation of an organization header.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/organization-response.ts"
)]
pub struct OrganizationResponse {
    pub id: String,
    pub selector: String,
    pub name: String,
    #[ts(type = "number")]
    pub permissions_version: u64,
}

impl From<&Organization> for OrganizationResponse {
    fn from(value: &Organization) -> Self {
        Self {
            id: value.id().to_string(),
            selector: value.selector().to_owned(),
            name: value.name().to_owned(),
            permissions_version: value.permissions_version(),
        }
    }
}
