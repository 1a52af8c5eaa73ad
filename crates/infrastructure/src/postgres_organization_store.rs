use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tenantgate_application::OrganizationStore;
use tenantgate_core::{AppError, AppResult, OrganizationId, UserId};
use tenantgate_domain::{INITIAL_PERMISSIONS_VERSION, Organization, OrganizationPatch, TeamMember};
use uuid::Uuid;

use crate::organization_document::{MemberDocument, OrganizationDocument, OrganizationHeader};

/// PostgreSQL-backed organization store.
///
/// Each organization is one row with its roles, members, invites and grants
/// in a JSONB document. Patch batches run under a row lock.
#[derive(Clone)]
pub struct PostgresOrganizationStore {
    pool: PgPool,
}

impl PostgresOrganizationStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct OrganizationRow {
    id: Uuid,
    selector: String,
    name: String,
    document: Json<OrganizationDocument>,
    permissions_version: i64,
}

impl OrganizationRow {
    fn into_organization(self) -> AppResult<Organization> {
        let header = OrganizationHeader {
            id: OrganizationId::from_uuid(self.id),
            selector: self.selector,
            name: self.name,
            permissions_version: self.permissions_version,
        };
        self.document.0.into_organization(header)
    }
}

#[derive(Debug, FromRow)]
struct MemberRow {
    member: Json<MemberDocument>,
}

fn version_column(organization: &Organization) -> AppResult<i64> {
    i64::try_from(organization.permissions_version()).map_err(|_| {
        AppError::Internal(format!(
            "permissions version of organization '{}' overflows storage",
            organization.id()
        ))
    })
}

#[async_trait]
impl OrganizationStore for PostgresOrganizationStore {
    async fn insert_organization(&self, organization: Organization) -> AppResult<()> {
        let document = OrganizationDocument::from_organization(&organization);
        let result = sqlx::query(
            r#"
            INSERT INTO organizations (id, selector, name, document, permissions_version)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(organization.id().as_uuid())
        .bind(organization.selector())
        .bind(organization.name())
        .bind(Json(document))
        .bind(version_column(&organization)?)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(error) => {
                if let sqlx::Error::Database(database_error) = &error
                    && database_error.code().as_deref() == Some("23505")
                {
                    return Err(AppError::Conflict(format!(
                        "organization '{}' already exists",
                        organization.selector()
                    )));
                }

                Err(AppError::Internal(format!(
                    "failed to insert organization '{}': {error}",
                    organization.selector()
                )))
            }
        }
    }

    async fn get_organization(
        &self,
        organization_id: OrganizationId,
    ) -> AppResult<Option<Organization>> {
        sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT id, selector, name, document, permissions_version
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(organization_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load organization '{organization_id}': {error}"
            ))
        })?
        .map(OrganizationRow::into_organization)
        .transpose()
    }

    async fn get_organization_by_selector(
        &self,
        selector: &str,
    ) -> AppResult<Option<Organization>> {
        sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT id, selector, name, document, permissions_version
            FROM organizations
            WHERE selector = $1
            "#,
        )
        .bind(selector)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load organization by selector '{selector}': {error}"
            ))
        })?
        .map(OrganizationRow::into_organization)
        .transpose()
    }

    async fn get_membership(
        &self,
        user_id: &UserId,
        organization_id: OrganizationId,
    ) -> AppResult<Option<TeamMember>> {
        let row = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT member
            FROM organizations,
                 jsonb_array_elements(document -> 'members') AS member
            WHERE id = $1 AND member ->> 'user_id' = $2
            LIMIT 1
            "#,
        )
        .bind(organization_id.as_uuid())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load membership of '{user_id}' in organization '{organization_id}': {error}"
            ))
        })?;

        row.map(|row| row.member.0.into_member()).transpose()
    }

    async fn patch_organization(
        &self,
        organization_id: OrganizationId,
        patches: &[OrganizationPatch],
    ) -> AppResult<Organization> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start patch transaction for organization '{organization_id}': {error}"
            ))
        })?;

        let mut organization = sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT id, selector, name, document, permissions_version
            FROM organizations
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(organization_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to lock organization '{organization_id}': {error}"
            ))
        })?
        .ok_or(AppError::OrganizationNotFound)?
        .into_organization()?;

        organization.apply_patches(patches)?;

        sqlx::query(
            r#"
            UPDATE organizations
            SET name = $2,
                document = $3,
                permissions_version = $4,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(organization_id.as_uuid())
        .bind(organization.name())
        .bind(Json(OrganizationDocument::from_organization(&organization)))
        .bind(version_column(&organization)?)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to write organization '{organization_id}': {error}"
            ))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit patch transaction for organization '{organization_id}': {error}"
            ))
        })?;

        Ok(organization)
    }

    async fn permissions_version(&self, organization_id: OrganizationId) -> AppResult<Option<u64>> {
        let version = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT permissions_version
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(organization_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to read permissions version of organization '{organization_id}': {error}"
            ))
        })?;

        Ok(version.map(|version| {
            u64::try_from(version)
                .unwrap_or_default()
                .max(INITIAL_PERMISSIONS_VERSION)
        }))
    }

    async fn list_organization_ids(&self) -> AppResult<Vec<OrganizationId>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM organizations
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list organizations: {error}"))
        })?;

        Ok(ids.into_iter().map(OrganizationId::from_uuid).collect())
    }
}
