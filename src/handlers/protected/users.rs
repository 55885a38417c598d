use axum::extract::{Extension, Path, Query};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::iam;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::user_service::{NewUser, UserService};

use super::{audit, page, resolve_permissions};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/users - List users in the caller's tenant
pub async fn list(
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "users:read")?;

    let (limit, offset) = page(query.limit, query.offset);
    let service = UserService::new().await?;
    let users = service.list_users(auth_user.tenant_id, limit, offset).await?;

    let data: Vec<Value> = users.iter().map(|u| u.to_api_output()).collect();
    Ok(ApiResponse::success(json!(data)))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub access: String,
}

/// POST /api/users - Create an active user (admin-driven)
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "users:write")?;

    let service = UserService::new().await?;
    let user = service
        .create_user(
            auth_user.tenant_id,
            NewUser {
                email: &payload.email,
                name: &payload.name,
                password: &payload.password,
                access: &payload.access,
                is_active: true,
            },
        )
        .await?;

    audit(
        &auth_user,
        "user.create",
        "user",
        Some(user.id),
        json!({ "email": user.email, "access": user.access }),
    );

    Ok(ApiResponse::created(user.to_api_output()))
}

/// GET /api/users/:id - User detail including directly assigned role ids
pub async fn get(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "users:read")?;

    let service = UserService::new().await?;
    let user = service.get_user(auth_user.tenant_id, id).await?;
    let role_ids = service.assigned_role_ids(user.id).await?;

    let mut data = user.to_api_output();
    data["role_ids"] = json!(role_ids);
    Ok(ApiResponse::success(data))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub access: Option<String>,
    pub is_active: Option<bool>,
}

/// PUT /api/users/:id
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "users:write")?;

    let service = UserService::new().await?;
    let user = service
        .update_user(
            auth_user.tenant_id,
            id,
            payload.name.as_deref(),
            payload.access.as_deref(),
            payload.is_active,
        )
        .await?;

    audit(&auth_user, "user.update", "user", Some(user.id), json!(payload_summary(&payload)));

    Ok(ApiResponse::success(user.to_api_output()))
}

fn payload_summary(payload: &UpdateUserRequest) -> Value {
    json!({
        "name": payload.name,
        "access": payload.access,
        "is_active": payload.is_active,
    })
}

/// DELETE /api/users/:id - Soft delete
pub async fn delete(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "users:write")?;

    let service = UserService::new().await?;
    let user = service.delete_user(auth_user.tenant_id, id).await?;

    audit(&auth_user, "user.delete", "user", Some(user.id), json!({ "email": user.email }));

    Ok(ApiResponse::success(user.to_api_output()))
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role_id: Uuid,
}

/// POST /api/users/:id/roles - Assign a role directly to a user
pub async fn assign_role(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "roles:write")?;

    let service = UserService::new().await?;
    service.assign_role(auth_user.tenant_id, id, payload.role_id).await?;

    audit(
        &auth_user,
        "user.assign_role",
        "user",
        Some(id),
        json!({ "role_id": payload.role_id }),
    );

    Ok(ApiResponse::success(json!({ "user_id": id, "role_id": payload.role_id })))
}

/// DELETE /api/users/:id/roles/:role_id
pub async fn remove_role(
    Extension(auth_user): Extension<AuthUser>,
    Path((id, role_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "roles:write")?;

    let service = UserService::new().await?;
    service.remove_role(auth_user.tenant_id, id, role_id).await?;

    audit(
        &auth_user,
        "user.remove_role",
        "user",
        Some(id),
        json!({ "role_id": role_id }),
    );

    Ok(ApiResponse::success(json!({ "user_id": id, "role_id": role_id })))
}
