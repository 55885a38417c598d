use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::AuditEventRow;

/// Query side of the audit pipeline: the write side lives in `crate::audit`
pub struct AuditService {
    pool: PgPool,
}

#[derive(Debug, Default)]
pub struct AuditQuery<'a> {
    pub action: Option<&'a str>,
    pub resource_type: Option<&'a str>,
    pub actor_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

impl AuditService {
    pub async fn new() -> Result<Self, DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    /// Newest-first listing scoped to one tenant
    pub async fn list_events(
        &self,
        tenant_id: Uuid,
        query: AuditQuery<'_>,
    ) -> Result<Vec<AuditEventRow>, DatabaseError> {
        let events: Vec<AuditEventRow> = sqlx::query_as(
            r#"
            SELECT * FROM audit_events
            WHERE tenant_id = $1
              AND ($2::text IS NULL OR action = $2)
              AND ($3::text IS NULL OR resource_type = $3)
              AND ($4::uuid IS NULL OR actor_id = $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(tenant_id)
        .bind(query.action)
        .bind(query.resource_type)
        .bind(query.actor_id)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}
