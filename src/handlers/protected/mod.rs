pub mod audit;
pub mod auth;
pub mod businesses;
pub mod groups;
pub mod roles;
pub mod root;
pub mod rules;
pub mod users;

use serde_json::Value;
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditLogger};
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::iam::{PermissionResolver, PermissionSet};
use crate::middleware::AuthUser;

/// Resolve the caller's effective permissions for this request
pub async fn resolve_permissions(auth_user: &AuthUser) -> Result<PermissionSet, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let set = PermissionResolver::new(pool)
        .resolve(auth_user.tenant_id, auth_user.user_id)
        .await?;
    Ok(set)
}

/// Clamp requested pagination against configured page size limits
pub fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let api = &config::config().api;
    let limit = limit.unwrap_or(api.default_page_size).clamp(1, api.max_page_size);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

/// Emit an audit event attributed to the authenticated caller
pub fn audit(
    auth_user: &AuthUser,
    action: &str,
    resource_type: &str,
    resource_id: Option<Uuid>,
    detail: Value,
) {
    AuditLogger::record(AuditEvent::new(
        Some(auth_user.tenant_id),
        Some(auth_user.user_id),
        action,
        resource_type,
        resource_id,
        detail,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_to_config_limits() {
        // Development defaults: max 1000, default 50
        assert_eq!(page(None, None), (50, 0));
        assert_eq!(page(Some(10_000), Some(-5)), (1000, 0));
        assert_eq!(page(Some(0), Some(20)), (1, 20));
    }
}
