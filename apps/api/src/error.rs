use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tenantgate_core::AppError;
use tracing::error;
use ts_rs::TS;

/// API error payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    message: String,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl ApiError {
    /// Status and client-facing message.
    ///
    /// Credential and tenant-access failures share one message per status so
    /// responses never reveal whether an organization, member or key exists.
    fn status_and_message(&self) -> (StatusCode, String) {
        match &self.0 {
            AppError::Unauthenticated | AppError::InvalidApiKey | AppError::ExpiredApiKey => (
                StatusCode::UNAUTHORIZED,
                "authentication required".to_owned(),
            ),
            AppError::NoOrganizationSelected => (
                StatusCode::FORBIDDEN,
                "no active organization selected".to_owned(),
            ),
            AppError::OrganizationNotFound | AppError::NotAMember => (
                StatusCode::FORBIDDEN,
                "access to this organization is denied".to_owned(),
            ),
            AppError::PermissionDenied { .. } | AppError::EscalationDenied { .. } => {
                (StatusCode::FORBIDDEN, self.0.to_string())
            }
            AppError::InvalidGrantWindow(_) | AppError::Validation(_) => {
                (StatusCode::BAD_REQUEST, self.0.to_string())
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.0.to_string()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_owned(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let AppError::Internal(detail) = &self.0 {
            error!(error = %detail, "request failed with internal error");
        }

        let (status, message) = self.status_and_message();
        (status, Json(ErrorResponse { message })).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use tenantgate_core::AppError;

    use super::ApiError;

    fn status_of(error: AppError) -> StatusCode {
        ApiError(error).into_response().status()
    }

    #[test]
    fn credential_failures_map_to_unauthorized() {
        for error in [
            AppError::Unauthenticated,
            AppError::InvalidApiKey,
            AppError::ExpiredApiKey,
        ] {
            assert_eq!(status_of(error), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn tenant_access_failures_share_one_message() {
        let (not_found_status, not_found_message) =
            ApiError(AppError::OrganizationNotFound).status_and_message();
        let (not_member_status, not_member_message) =
            ApiError(AppError::NotAMember).status_and_message();

        assert_eq!(not_found_status, StatusCode::FORBIDDEN);
        assert_eq!(not_member_status, StatusCode::FORBIDDEN);
        assert_eq!(not_found_message, not_member_message);
    }

    #[test]
    fn authorization_and_input_failures_keep_their_status() {
        assert_eq!(
            status_of(AppError::PermissionDenied {
                permission: "manage_roles".to_owned()
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(AppError::EscalationDenied {
                permission: "manage_grants".to_owned()
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(AppError::InvalidGrantWindow("past".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::NotFound("role".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Conflict("role".to_owned())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let (status, message) =
            ApiError(AppError::Internal("pool timed out".to_owned())).status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("pool"));
    }
}
