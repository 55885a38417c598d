use axum::extract::{Extension, Path};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::iam;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::role_service::RoleService;

use super::{audit, resolve_permissions};

/// GET /api/roles - Tenant roles plus global roles
pub async fn list(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "roles:read")?;

    let service = RoleService::new().await?;
    let roles = service.list_roles(auth_user.tenant_id).await?;
    Ok(ApiResponse::success(json!(roles)))
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

/// POST /api/roles
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "roles:write")?;

    let service = RoleService::new().await?;
    let role = service
        .create_role(
            auth_user.tenant_id,
            &payload.name,
            payload.description.as_deref(),
            &payload.permissions,
        )
        .await?;

    audit(
        &auth_user,
        "role.create",
        "role",
        Some(role.id),
        json!({ "name": role.name, "permissions": role.permissions }),
    );

    Ok(ApiResponse::created(json!(role)))
}

/// GET /api/roles/:id
pub async fn get(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "roles:read")?;

    let service = RoleService::new().await?;
    let role = service.get_role(auth_user.tenant_id, id).await?;
    Ok(ApiResponse::success(json!(role)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

/// PUT /api/roles/:id - Tenant-owned roles only; global roles are read-only
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "roles:write")?;

    let service = RoleService::new().await?;
    let role = service
        .update_role(
            auth_user.tenant_id,
            id,
            payload.description.as_deref(),
            payload.permissions.as_deref(),
        )
        .await?;

    audit(
        &auth_user,
        "role.update",
        "role",
        Some(role.id),
        json!({ "permissions": role.permissions }),
    );

    Ok(ApiResponse::success(json!(role)))
}

/// DELETE /api/roles/:id
pub async fn delete(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "roles:write")?;

    let service = RoleService::new().await?;
    let role = service.delete_role(auth_user.tenant_id, id).await?;

    audit(&auth_user, "role.delete", "role", Some(role.id), json!({ "name": role.name }));

    Ok(ApiResponse::success(json!(role)))
}
