use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::Rule;
use crate::error::ApiError;
use crate::rules::{condition, engine, error::RuleError};

#[derive(Debug, thiserror::Error)]
pub enum RuleServiceError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Rule not found")]
    NotFound,
    #[error("Rule already exists: {0}")]
    AlreadyExists(String),
    #[error(transparent)]
    Rule(#[from] RuleError),
}

impl From<sqlx::Error> for RuleServiceError {
    fn from(err: sqlx::Error) -> Self {
        RuleServiceError::Database(DatabaseError::Sqlx(err))
    }
}

impl From<RuleServiceError> for ApiError {
    fn from(err: RuleServiceError) -> Self {
        match err {
            RuleServiceError::Database(e) => e.into(),
            RuleServiceError::NotFound => ApiError::not_found("Rule not found"),
            RuleServiceError::AlreadyExists(name) => {
                ApiError::conflict(format!("Rule already exists: {}", name))
            }
            RuleServiceError::Rule(e) => e.into(),
        }
    }
}

pub struct RuleService {
    pool: PgPool,
}

pub struct NewRule<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub priority: i32,
    pub enabled: bool,
    pub condition: &'a Value,
    pub actions: &'a Value,
}

impl RuleService {
    pub async fn new() -> Result<Self, RuleServiceError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    /// Validate condition and actions the same way for create and update
    fn validate(condition: &Value, actions: &Value) -> Result<(), RuleServiceError> {
        let max_depth = config::config().rules.max_nested_depth;
        condition::validate(condition, max_depth)?;
        engine::validate_actions(actions)?;
        Ok(())
    }

    pub async fn create_rule(
        &self,
        tenant_id: Uuid,
        new: NewRule<'_>,
    ) -> Result<Rule, RuleServiceError> {
        Self::validate(new.condition, new.actions)?;

        let exists: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM rules WHERE tenant_id = $1 AND name = $2 AND deleted_at IS NULL",
        )
        .bind(tenant_id)
        .bind(new.name)
        .fetch_one(&self.pool)
        .await?;

        if exists.0 > 0 {
            return Err(RuleServiceError::AlreadyExists(new.name.to_string()));
        }

        let rule: Rule = sqlx::query_as(
            r#"
            INSERT INTO rules (tenant_id, name, description, priority, enabled, condition, actions)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(new.name)
        .bind(new.description)
        .bind(new.priority)
        .bind(new.enabled)
        .bind(new.condition)
        .bind(new.actions)
        .fetch_one(&self.pool)
        .await?;

        Ok(rule)
    }

    pub async fn get_rule(&self, tenant_id: Uuid, id: Uuid) -> Result<Rule, RuleServiceError> {
        let rule: Option<Rule> = sqlx::query_as(
            r#"
            SELECT * FROM rules
            WHERE id = $1 AND (tenant_id = $2 OR tenant_id IS NULL) AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        rule.ok_or(RuleServiceError::NotFound)
    }

    /// Tenant rules plus global rules, in engine evaluation order
    pub async fn list_rules(&self, tenant_id: Uuid) -> Result<Vec<Rule>, RuleServiceError> {
        let rules: Vec<Rule> = sqlx::query_as(
            r#"
            SELECT * FROM rules
            WHERE (tenant_id = $1 OR tenant_id IS NULL) AND deleted_at IS NULL
            ORDER BY priority, name
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rules)
    }

    pub async fn update_rule(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        description: Option<&str>,
        priority: Option<i32>,
        enabled: Option<bool>,
        condition: Option<&Value>,
        actions: Option<&Value>,
    ) -> Result<Rule, RuleServiceError> {
        // Validate whichever halves are changing against the stored other half
        let existing = self.get_rule(tenant_id, id).await?;
        Self::validate(
            condition.unwrap_or(&existing.condition),
            actions.unwrap_or(&existing.actions),
        )?;

        let rule: Option<Rule> = sqlx::query_as(
            r#"
            UPDATE rules
            SET description = COALESCE($3, description),
                priority = COALESCE($4, priority),
                enabled = COALESCE($5, enabled),
                condition = COALESCE($6, condition),
                actions = COALESCE($7, actions),
                updated_at = now()
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(description)
        .bind(priority)
        .bind(enabled)
        .bind(condition)
        .bind(actions)
        .fetch_optional(&self.pool)
        .await?;

        rule.ok_or(RuleServiceError::NotFound)
    }

    pub async fn delete_rule(&self, tenant_id: Uuid, id: Uuid) -> Result<Rule, RuleServiceError> {
        let rule: Option<Rule> = sqlx::query_as(
            r#"
            UPDATE rules
            SET deleted_at = now(), updated_at = now()
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        rule.ok_or(RuleServiceError::NotFound)
    }
}
