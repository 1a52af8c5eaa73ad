use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenantgate_application::PermissionSnapshot;
use tenantgate_core::{AppError, AppResult};
use tenantgate_domain::{Permission, PermissionSet};
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Current permissions version of the caller's organization.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permissions-version-response.ts"
)]
pub struct PermissionsVersionResponse {
    #[ts(type = "number")]
    pub version: u64,
}

/// Effective permissions of the caller.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-snapshot-response.ts"
)]
pub struct PermissionSnapshotResponse {
    pub organization_id: String,
    pub actor_id: String,
    pub source: String,
    pub role_key: Option<String>,
    pub role_name: Option<String>,
    pub permissions: Vec<String>,
    #[ts(type = "number")]
    pub permissions_version: u64,
}

impl From<PermissionSnapshot> for PermissionSnapshotResponse {
    fn from(value: PermissionSnapshot) -> Self {
        Self {
            organization_id: value.organization_id.to_string(),
            actor_id: value.actor_id,
            source: value.source.as_str().to_owned(),
            role_key: value.role_key.map(|key| key.as_str().to_owned()),
            role_name: value.role_name,
            permissions: value.permissions.storage_keys(),
            permissions_version: value.permissions_version,
        }
    }
}

/// Switches the session's active organization.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/select-organization-request.ts"
)]
pub struct SelectOrganizationRequest {
    pub selector: String,
}

/// Development-only session login.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/dev-session-request.ts"
)]
pub struct DevSessionRequest {
    pub user_id: String,
    pub organization: Option<String>,
}

/// Parses transport permission keys, rejecting unknown ones.
pub fn parse_permissions(values: &[String]) -> AppResult<PermissionSet> {
    values
        .iter()
        .map(|value| Permission::from_transport(value.as_str()))
        .collect()
}

/// Parses an RFC 3339 timestamp.
pub fn parse_timestamp(field: &str, value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| AppError::Validation(format!("invalid {field} '{value}': {error}")))
}
