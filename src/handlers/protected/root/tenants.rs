use axum::extract::{Extension, Path};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::iam;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::tenant_service::TenantService;

use super::super::{audit, resolve_permissions};

/// GET /api/root/tenants
pub async fn list(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "tenants:manage")?;

    let service = TenantService::new().await?;
    let tenants = service.list_tenants().await?;
    Ok(ApiResponse::success(json!(tenants)))
}

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    pub display_name: String,
}

/// POST /api/root/tenants
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateTenantRequest>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "tenants:manage")?;

    let service = TenantService::new().await?;
    let tenant = service.create_tenant(&payload.name, &payload.display_name).await?;

    audit(
        &auth_user,
        "tenant.create",
        "tenant",
        Some(tenant.id),
        json!({ "name": tenant.name }),
    );

    Ok(ApiResponse::created(json!(tenant)))
}

/// GET /api/root/tenants/:id
pub async fn get(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "tenants:manage")?;

    let service = TenantService::new().await?;
    let tenant = service.get_tenant_by_id(id).await?;
    Ok(ApiResponse::success(json!(tenant)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTenantRequest {
    pub display_name: Option<String>,
    pub is_active: Option<bool>,
}

/// PUT /api/root/tenants/:id
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTenantRequest>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "tenants:manage")?;

    let service = TenantService::new().await?;
    let tenant = service
        .update_tenant(id, payload.display_name.as_deref(), payload.is_active)
        .await?;

    audit(
        &auth_user,
        "tenant.update",
        "tenant",
        Some(tenant.id),
        json!({ "display_name": tenant.display_name, "is_active": tenant.is_active }),
    );

    Ok(ApiResponse::success(json!(tenant)))
}

/// DELETE /api/root/tenants/:id - Soft delete; also deactivates the tenant
pub async fn delete(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "tenants:manage")?;

    let service = TenantService::new().await?;
    let tenant = service.delete_tenant(id).await?;

    audit(
        &auth_user,
        "tenant.delete",
        "tenant",
        Some(tenant.id),
        json!({ "name": tenant.name }),
    );

    Ok(ApiResponse::success(json!(tenant)))
}
