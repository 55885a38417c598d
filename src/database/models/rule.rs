use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Declarative workflow rule. Global when `tenant_id` is NULL.
///
/// `condition` is a nested boolean tree over business document fields;
/// `actions` is an array of requirement actions. Both are validated on
/// write by `rules::condition::validate` and `rules::engine::validate_actions`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Rule {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    /// Lower numbers evaluate first
    pub priority: i32,
    pub enabled: bool,
    pub condition: Value,
    pub actions: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
