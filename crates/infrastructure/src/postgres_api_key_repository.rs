use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tenantgate_application::ApiKeyRepository;
use tenantgate_core::{AppError, AppResult, NonEmptyString, OrganizationId, UserId};
use tenantgate_domain::{ApiKeyCredential, ApiKeyCredentialParts, ApiKeyId, PermissionSet};
use tracing::warn;
use uuid::Uuid;

/// PostgreSQL-backed API key repository.
#[derive(Clone)]
pub struct PostgresApiKeyRepository {
    pool: PgPool,
}

impl PostgresApiKeyRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ApiKeyRow {
    id: Uuid,
    organization_id: Uuid,
    name: String,
    key_hash: String,
    display_prefix: String,
    created_by: String,
    permissions: Json<Vec<String>>,
    expires_at: Option<DateTime<Utc>>,
    last_used_at: Option<DateTime<Utc>>,
    is_revoked: bool,
    created_at: DateTime<Utc>,
}

impl ApiKeyRow {
    fn into_credential(self) -> AppResult<ApiKeyCredential> {
        let (permissions, unknown) = PermissionSet::from_storage_keys(self.permissions.0);
        if !unknown.is_empty() {
            warn!(
                api_key_id = %self.id,
                unknown = ?unknown,
                "ignoring unknown permission keys on api key"
            );
        }

        Ok(ApiKeyCredential::from(ApiKeyCredentialParts {
            id: ApiKeyId::from_uuid(self.id),
            name: NonEmptyString::new(self.name)?,
            key_hash: self.key_hash,
            display_prefix: self.display_prefix,
            organization_id: OrganizationId::from_uuid(self.organization_id),
            created_by: UserId::new(self.created_by)?,
            permissions,
            expires_at: self.expires_at,
            last_used_at: self.last_used_at,
            is_revoked: self.is_revoked,
            created_at: self.created_at,
        }))
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, organization_id, name, key_hash, display_prefix, created_by,
           permissions, expires_at, last_used_at, is_revoked, created_at
    FROM api_keys
"#;

#[async_trait]
impl ApiKeyRepository for PostgresApiKeyRepository {
    async fn insert(&self, credential: ApiKeyCredential) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO api_keys (
                id,
                organization_id,
                name,
                key_hash,
                display_prefix,
                created_by,
                permissions,
                expires_at,
                last_used_at,
                is_revoked,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(credential.id().as_uuid())
        .bind(credential.organization_id().as_uuid())
        .bind(credential.name())
        .bind(credential.key_hash())
        .bind(credential.display_prefix())
        .bind(credential.created_by().as_str())
        .bind(Json(credential.permissions().storage_keys()))
        .bind(credential.expires_at())
        .bind(credential.last_used_at())
        .bind(credential.is_revoked())
        .bind(credential.created_at())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(error) => {
                if let sqlx::Error::Database(database_error) = &error
                    && database_error.code().as_deref() == Some("23505")
                {
                    return Err(AppError::Conflict(format!(
                        "api key '{}' already exists",
                        credential.id()
                    )));
                }

                Err(AppError::Internal(format!(
                    "failed to insert api key '{}': {error}",
                    credential.id()
                )))
            }
        }
    }

    async fn find_by_hash(&self, key_hash: &str) -> AppResult<Option<ApiKeyCredential>> {
        sqlx::query_as::<_, ApiKeyRow>(&format!("{SELECT_COLUMNS} WHERE key_hash = $1"))
            .bind(key_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to look up api key by hash: {error}"))
            })?
            .map(ApiKeyRow::into_credential)
            .transpose()
    }

    async fn find_by_id(
        &self,
        organization_id: OrganizationId,
        key_id: ApiKeyId,
    ) -> AppResult<Option<ApiKeyCredential>> {
        sqlx::query_as::<_, ApiKeyRow>(&format!(
            "{SELECT_COLUMNS} WHERE organization_id = $1 AND id = $2"
        ))
        .bind(organization_id.as_uuid())
        .bind(key_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load api key '{key_id}' for organization '{organization_id}': {error}"
            ))
        })?
        .map(ApiKeyRow::into_credential)
        .transpose()
    }

    async fn list_for_organization(
        &self,
        organization_id: OrganizationId,
    ) -> AppResult<Vec<ApiKeyCredential>> {
        sqlx::query_as::<_, ApiKeyRow>(&format!(
            "{SELECT_COLUMNS} WHERE organization_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(organization_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list api keys for organization '{organization_id}': {error}"
            ))
        })?
        .into_iter()
        .map(ApiKeyRow::into_credential)
        .collect()
    }

    async fn revoke(&self, organization_id: OrganizationId, key_id: ApiKeyId) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE api_keys
            SET is_revoked = TRUE
            WHERE organization_id = $1 AND id = $2 AND is_revoked = FALSE
            "#,
        )
        .bind(organization_id.as_uuid())
        .bind(key_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to revoke api key '{key_id}': {error}"))
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn touch_last_used(&self, key_id: ApiKeyId, used_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE api_keys
            SET last_used_at = $2
            WHERE id = $1
            "#,
        )
        .bind(key_id.as_uuid())
        .bind(used_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to record last use of api key '{key_id}': {error}"
            ))
        })?;

        Ok(())
    }
}
