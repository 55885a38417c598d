use axum::extract::{Extension, Query};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::iam;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::audit_service::{AuditQuery, AuditService};

use super::{page, resolve_permissions};

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub actor_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/audit - Tenant-scoped audit trail, newest first
pub async fn list(
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ListEventsQuery>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "audit:read")?;

    let (limit, offset) = page(query.limit, query.offset);
    let service = AuditService::new().await?;
    let events = service
        .list_events(
            auth_user.tenant_id,
            AuditQuery {
                action: query.action.as_deref(),
                resource_type: query.resource_type.as_deref(),
                actor_id: query.actor_id,
                limit,
                offset,
            },
        )
        .await?;

    Ok(ApiResponse::success(json!(events)))
}
