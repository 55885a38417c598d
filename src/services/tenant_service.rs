use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::Tenant;
use crate::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Tenant already exists: {0}")]
    AlreadyExists(String),
    #[error("Tenant not found: {0}")]
    NotFound(String),
    #[error("Invalid tenant name: {0}")]
    InvalidName(String),
}

impl From<sqlx::Error> for TenantError {
    fn from(err: sqlx::Error) -> Self {
        TenantError::Database(DatabaseError::Sqlx(err))
    }
}

impl From<TenantError> for ApiError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::Database(e) => e.into(),
            TenantError::AlreadyExists(name) => {
                ApiError::conflict(format!("Tenant already exists: {}", name))
            }
            TenantError::NotFound(name) => ApiError::not_found(format!("Tenant not found: {}", name)),
            TenantError::InvalidName(msg) => ApiError::validation_error(msg, None),
        }
    }
}

pub struct TenantService {
    pool: PgPool,
}

impl TenantService {
    pub async fn new() -> Result<Self, TenantError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    pub async fn create_tenant(
        &self,
        name: &str,
        display_name: &str,
    ) -> Result<Tenant, TenantError> {
        Self::validate_tenant_name(name)?;

        if self.tenant_exists(name).await? {
            return Err(TenantError::AlreadyExists(name.to_string()));
        }

        let tenant: Tenant = sqlx::query_as(
            r#"
            INSERT INTO tenants (name, display_name, is_active)
            VALUES ($1, $2, true)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(tenant)
    }

    /// Validate tenant name follows rules
    fn validate_tenant_name(name: &str) -> Result<(), TenantError> {
        if name.len() < 2 {
            return Err(TenantError::InvalidName(
                "Tenant name must be at least 2 characters".to_string(),
            ));
        }

        if name.len() > 100 {
            return Err(TenantError::InvalidName(
                "Tenant name must be less than 100 characters".to_string(),
            ));
        }

        // Only allow alphanumeric, hyphens, and underscores
        if !name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
            return Err(TenantError::InvalidName(
                "Tenant name can only contain letters, numbers, hyphens, and underscores"
                    .to_string(),
            ));
        }

        Ok(())
    }

    async fn tenant_exists(&self, name: &str) -> Result<bool, TenantError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM tenants WHERE name = $1 AND deleted_at IS NULL")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.0 > 0)
    }

    pub async fn get_tenant(&self, name: &str) -> Result<Option<Tenant>, TenantError> {
        let tenant: Option<Tenant> =
            sqlx::query_as("SELECT * FROM tenants WHERE name = $1 AND deleted_at IS NULL")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        Ok(tenant)
    }

    pub async fn get_tenant_by_id(&self, id: Uuid) -> Result<Tenant, TenantError> {
        let tenant: Option<Tenant> =
            sqlx::query_as("SELECT * FROM tenants WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        tenant.ok_or_else(|| TenantError::NotFound(id.to_string()))
    }

    pub async fn list_tenants(&self) -> Result<Vec<Tenant>, TenantError> {
        let tenants: Vec<Tenant> = sqlx::query_as(
            "SELECT * FROM tenants WHERE deleted_at IS NULL ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tenants)
    }

    pub async fn update_tenant(
        &self,
        id: Uuid,
        display_name: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<Tenant, TenantError> {
        let tenant: Option<Tenant> = sqlx::query_as(
            r#"
            UPDATE tenants
            SET display_name = COALESCE($2, display_name),
                is_active = COALESCE($3, is_active),
                updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(display_name)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?;

        tenant.ok_or_else(|| TenantError::NotFound(id.to_string()))
    }

    /// Soft delete; the row survives for audit history
    pub async fn delete_tenant(&self, id: Uuid) -> Result<Tenant, TenantError> {
        let tenant: Option<Tenant> = sqlx::query_as(
            r#"
            UPDATE tenants
            SET deleted_at = now(), is_active = false, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        tenant.ok_or_else(|| TenantError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_tenant_names() {
        assert!(TenantService::validate_tenant_name("acme-co").is_ok());
        assert!(TenantService::validate_tenant_name("acme_co_2").is_ok());
        assert!(TenantService::validate_tenant_name("a").is_err());
        assert!(TenantService::validate_tenant_name("bad name").is_err());
        assert!(TenantService::validate_tenant_name("drop;tables").is_err());
        assert!(TenantService::validate_tenant_name(&"x".repeat(101)).is_err());
    }
}
