use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Persisted audit event as read back from the `audit_events` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditEventRow {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    /// Dotted action name, e.g. "user.create"
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<Uuid>,
    pub detail: Value,
    pub created_at: DateTime<Utc>,
}
