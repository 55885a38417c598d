use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Business {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    /// llc | c_corp | s_corp | nonprofit
    pub entity_type: String,
    /// Two-letter state code, e.g. "DE"
    pub formation_state: String,
    /// draft | in_progress | filed | complete
    pub status: String,
    /// Free-form attributes the rule engine evaluates against
    pub attributes: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Business {
    /// Document the rule engine sees: the free-form attributes with the
    /// fixed columns merged in so rules can match on either.
    pub fn to_document(&self) -> Value {
        let mut doc = match &self.attributes {
            Value::Object(map) => Value::Object(map.clone()),
            _ => Value::Object(serde_json::Map::new()),
        };
        doc["name"] = Value::String(self.name.clone());
        doc["entity_type"] = Value::String(self.entity_type.clone());
        doc["formation_state"] = Value::String(self.formation_state.clone());
        doc["status"] = Value::String(self.status.clone());
        doc
    }
}

pub const ENTITY_TYPES: &[&str] = &["llc", "c_corp", "s_corp", "nonprofit"];
pub const STATUSES: &[&str] = &["draft", "in_progress", "filed", "complete"];
