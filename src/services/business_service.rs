use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::business::{Business, ENTITY_TYPES, STATUSES};
use crate::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum BusinessError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Business not found")]
    NotFound,
    #[error("Invalid entity type: {0}")]
    InvalidEntityType(String),
    #[error("Invalid formation state: {0}")]
    InvalidState(String),
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
}

impl From<sqlx::Error> for BusinessError {
    fn from(err: sqlx::Error) -> Self {
        BusinessError::Database(DatabaseError::Sqlx(err))
    }
}

impl From<BusinessError> for ApiError {
    fn from(err: BusinessError) -> Self {
        match err {
            BusinessError::Database(e) => e.into(),
            BusinessError::NotFound => ApiError::not_found("Business not found"),
            BusinessError::InvalidEntityType(t) => {
                ApiError::validation_error(format!("Invalid entity type: {}", t), None)
            }
            BusinessError::InvalidState(s) => {
                ApiError::validation_error(format!("Invalid formation state: {}", s), None)
            }
            BusinessError::InvalidStatus(s) => {
                ApiError::validation_error(format!("Invalid status: {}", s), None)
            }
        }
    }
}

pub struct BusinessService {
    pool: PgPool,
}

pub struct NewBusiness<'a> {
    pub name: &'a str,
    pub entity_type: &'a str,
    pub formation_state: &'a str,
    pub attributes: Option<&'a Value>,
}

impl BusinessService {
    pub async fn new() -> Result<Self, BusinessError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    fn validate_entity_type(entity_type: &str) -> Result<(), BusinessError> {
        if ENTITY_TYPES.contains(&entity_type) {
            Ok(())
        } else {
            Err(BusinessError::InvalidEntityType(entity_type.to_string()))
        }
    }

    fn validate_state(state: &str) -> Result<(), BusinessError> {
        if state.len() == 2 && state.chars().all(|c| c.is_ascii_uppercase()) {
            Ok(())
        } else {
            Err(BusinessError::InvalidState(state.to_string()))
        }
    }

    fn validate_status(status: &str) -> Result<(), BusinessError> {
        if STATUSES.contains(&status) {
            Ok(())
        } else {
            Err(BusinessError::InvalidStatus(status.to_string()))
        }
    }

    pub async fn create_business(
        &self,
        tenant_id: Uuid,
        new: NewBusiness<'_>,
    ) -> Result<Business, BusinessError> {
        Self::validate_entity_type(new.entity_type)?;
        Self::validate_state(new.formation_state)?;

        let attributes = new.attributes.cloned().unwrap_or_else(|| Value::Object(Default::default()));

        let business: Business = sqlx::query_as(
            r#"
            INSERT INTO businesses (tenant_id, name, entity_type, formation_state, status, attributes)
            VALUES ($1, $2, $3, $4, 'draft', $5)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(new.name)
        .bind(new.entity_type)
        .bind(new.formation_state)
        .bind(&attributes)
        .fetch_one(&self.pool)
        .await?;

        Ok(business)
    }

    pub async fn get_business(&self, tenant_id: Uuid, id: Uuid) -> Result<Business, BusinessError> {
        let business: Option<Business> = sqlx::query_as(
            "SELECT * FROM businesses WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        business.ok_or(BusinessError::NotFound)
    }

    pub async fn list_businesses(
        &self,
        tenant_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Business>, BusinessError> {
        let businesses: Vec<Business> = sqlx::query_as(
            r#"
            SELECT * FROM businesses
            WHERE tenant_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(businesses)
    }

    pub async fn update_business(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        name: Option<&str>,
        status: Option<&str>,
        attributes: Option<&Value>,
    ) -> Result<Business, BusinessError> {
        if let Some(status) = status {
            Self::validate_status(status)?;
        }

        let business: Option<Business> = sqlx::query_as(
            r#"
            UPDATE businesses
            SET name = COALESCE($3, name),
                status = COALESCE($4, status),
                attributes = COALESCE($5, attributes),
                updated_at = now()
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(name)
        .bind(status)
        .bind(attributes)
        .fetch_optional(&self.pool)
        .await?;

        business.ok_or(BusinessError::NotFound)
    }

    pub async fn delete_business(&self, tenant_id: Uuid, id: Uuid) -> Result<Business, BusinessError> {
        let business: Option<Business> = sqlx::query_as(
            r#"
            UPDATE businesses
            SET deleted_at = now(), updated_at = now()
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        business.ok_or(BusinessError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_entity_types() {
        assert!(BusinessService::validate_entity_type("llc").is_ok());
        assert!(BusinessService::validate_entity_type("c_corp").is_ok());
        assert!(BusinessService::validate_entity_type("partnership").is_err());
    }

    #[test]
    fn validates_formation_states() {
        assert!(BusinessService::validate_state("CA").is_ok());
        assert!(BusinessService::validate_state("ca").is_err());
        assert!(BusinessService::validate_state("CAL").is_err());
    }

    #[test]
    fn validates_statuses() {
        assert!(BusinessService::validate_status("draft").is_ok());
        assert!(BusinessService::validate_status("filed").is_ok());
        assert!(BusinessService::validate_status("archived").is_err());
    }
}
