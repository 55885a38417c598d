use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::IamRole;
use crate::error::ApiError;
use crate::iam::permissions::validate_permission;

#[derive(Debug, thiserror::Error)]
pub enum RoleError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Role not found")]
    NotFound,
    #[error("Role already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid permission: {0}")]
    InvalidPermission(String),
    #[error("System roles cannot be deleted")]
    SystemRole,
}

impl From<sqlx::Error> for RoleError {
    fn from(err: sqlx::Error) -> Self {
        RoleError::Database(DatabaseError::Sqlx(err))
    }
}

impl From<RoleError> for ApiError {
    fn from(err: RoleError) -> Self {
        match err {
            RoleError::Database(e) => e.into(),
            RoleError::NotFound => ApiError::not_found("Role not found"),
            RoleError::AlreadyExists(name) => {
                ApiError::conflict(format!("Role already exists: {}", name))
            }
            RoleError::InvalidPermission(msg) => ApiError::validation_error(msg, None),
            RoleError::SystemRole => ApiError::forbidden("System roles cannot be deleted"),
        }
    }
}

pub struct RoleService {
    pool: PgPool,
}

impl RoleService {
    pub async fn new() -> Result<Self, RoleError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    pub async fn create_role(
        &self,
        tenant_id: Uuid,
        name: &str,
        description: Option<&str>,
        permissions: &[String],
    ) -> Result<IamRole, RoleError> {
        Self::validate_permissions(permissions)?;

        let exists: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM iam_roles WHERE tenant_id = $1 AND name = $2 AND deleted_at IS NULL",
        )
        .bind(tenant_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        if exists.0 > 0 {
            return Err(RoleError::AlreadyExists(name.to_string()));
        }

        let role: IamRole = sqlx::query_as(
            r#"
            INSERT INTO iam_roles (tenant_id, name, description, permissions, is_system)
            VALUES ($1, $2, $3, $4, false)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(name)
        .bind(description)
        .bind(permissions)
        .fetch_one(&self.pool)
        .await?;

        Ok(role)
    }

    fn validate_permissions(permissions: &[String]) -> Result<(), RoleError> {
        for p in permissions {
            validate_permission(p).map_err(RoleError::InvalidPermission)?;
        }
        Ok(())
    }

    pub async fn get_role(&self, tenant_id: Uuid, id: Uuid) -> Result<IamRole, RoleError> {
        let role: Option<IamRole> = sqlx::query_as(
            r#"
            SELECT * FROM iam_roles
            WHERE id = $1 AND (tenant_id = $2 OR tenant_id IS NULL) AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        role.ok_or(RoleError::NotFound)
    }

    /// Tenant roles plus global roles, which apply to every tenant
    pub async fn list_roles(&self, tenant_id: Uuid) -> Result<Vec<IamRole>, RoleError> {
        let roles: Vec<IamRole> = sqlx::query_as(
            r#"
            SELECT * FROM iam_roles
            WHERE (tenant_id = $1 OR tenant_id IS NULL) AND deleted_at IS NULL
            ORDER BY tenant_id NULLS FIRST, name
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    pub async fn update_role(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        description: Option<&str>,
        permissions: Option<&[String]>,
    ) -> Result<IamRole, RoleError> {
        if let Some(permissions) = permissions {
            Self::validate_permissions(permissions)?;
        }

        // Only tenant-owned roles can be edited; global roles are read-only here
        let role: Option<IamRole> = sqlx::query_as(
            r#"
            UPDATE iam_roles
            SET description = COALESCE($3, description),
                permissions = COALESCE($4, permissions),
                updated_at = now()
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(description)
        .bind(permissions)
        .fetch_optional(&self.pool)
        .await?;

        role.ok_or(RoleError::NotFound)
    }

    pub async fn delete_role(&self, tenant_id: Uuid, id: Uuid) -> Result<IamRole, RoleError> {
        let existing = self.get_role(tenant_id, id).await?;
        if existing.is_system {
            return Err(RoleError::SystemRole);
        }

        let role: Option<IamRole> = sqlx::query_as(
            r#"
            UPDATE iam_roles
            SET deleted_at = now(), updated_at = now()
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        role.ok_or(RoleError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_permission_lists() {
        let good = vec!["users:read".to_string(), "businesses:*".to_string()];
        assert!(RoleService::validate_permissions(&good).is_ok());

        let bad = vec!["users:read".to_string(), "Nope".to_string()];
        assert!(matches!(
            RoleService::validate_permissions(&bad),
            Err(RoleError::InvalidPermission(_))
        ));
    }
}
