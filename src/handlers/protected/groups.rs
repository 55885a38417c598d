use axum::extract::{Extension, Path};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::iam;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::group_service::GroupService;

use super::{audit, resolve_permissions};

/// GET /api/groups
pub async fn list(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "groups:read")?;

    let service = GroupService::new().await?;
    let groups = service.list_groups(auth_user.tenant_id).await?;
    Ok(ApiResponse::success(json!(groups)))
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
}

/// POST /api/groups
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateGroupRequest>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "groups:write")?;

    let service = GroupService::new().await?;
    let group = service
        .create_group(auth_user.tenant_id, &payload.name, payload.description.as_deref())
        .await?;

    audit(&auth_user, "group.create", "group", Some(group.id), json!({ "name": group.name }));

    Ok(ApiResponse::created(json!(group)))
}

/// GET /api/groups/:id - Group detail with member and role ids
pub async fn get(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "groups:read")?;

    let service = GroupService::new().await?;
    let group = service.get_group(auth_user.tenant_id, id).await?;
    let member_ids = service.member_ids(group.id).await?;
    let role_ids = service.role_ids(group.id).await?;

    let mut data = json!(group);
    data["member_ids"] = json!(member_ids);
    data["role_ids"] = json!(role_ids);
    Ok(ApiResponse::success(data))
}

#[derive(Debug, Deserialize)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// PUT /api/groups/:id
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateGroupRequest>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "groups:write")?;

    let service = GroupService::new().await?;
    let group = service
        .update_group(
            auth_user.tenant_id,
            id,
            payload.name.as_deref(),
            payload.description.as_deref(),
        )
        .await?;

    audit(&auth_user, "group.update", "group", Some(group.id), json!({ "name": group.name }));

    Ok(ApiResponse::success(json!(group)))
}

/// DELETE /api/groups/:id
pub async fn delete(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "groups:write")?;

    let service = GroupService::new().await?;
    let group = service.delete_group(auth_user.tenant_id, id).await?;

    audit(&auth_user, "group.delete", "group", Some(group.id), json!({ "name": group.name }));

    Ok(ApiResponse::success(json!(group)))
}

#[derive(Debug, Deserialize)]
pub struct MemberRequest {
    pub user_id: Uuid,
}

/// POST /api/groups/:id/members
pub async fn add_member(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MemberRequest>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "groups:write")?;

    let service = GroupService::new().await?;
    service.add_member(auth_user.tenant_id, id, payload.user_id).await?;

    audit(
        &auth_user,
        "group.add_member",
        "group",
        Some(id),
        json!({ "user_id": payload.user_id }),
    );

    Ok(ApiResponse::success(json!({ "group_id": id, "user_id": payload.user_id })))
}

/// DELETE /api/groups/:id/members/:user_id
pub async fn remove_member(
    Extension(auth_user): Extension<AuthUser>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "groups:write")?;

    let service = GroupService::new().await?;
    service.remove_member(auth_user.tenant_id, id, user_id).await?;

    audit(
        &auth_user,
        "group.remove_member",
        "group",
        Some(id),
        json!({ "user_id": user_id }),
    );

    Ok(ApiResponse::success(json!({ "group_id": id, "user_id": user_id })))
}

#[derive(Debug, Deserialize)]
pub struct LinkRoleRequest {
    pub role_id: Uuid,
}

/// POST /api/groups/:id/roles
pub async fn link_role(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LinkRoleRequest>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "groups:write")?;
    iam::require(&permissions, "roles:read")?;

    let service = GroupService::new().await?;
    service.link_role(auth_user.tenant_id, id, payload.role_id).await?;

    audit(
        &auth_user,
        "group.link_role",
        "group",
        Some(id),
        json!({ "role_id": payload.role_id }),
    );

    Ok(ApiResponse::success(json!({ "group_id": id, "role_id": payload.role_id })))
}

/// DELETE /api/groups/:id/roles/:role_id
pub async fn unlink_role(
    Extension(auth_user): Extension<AuthUser>,
    Path((id, role_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "groups:write")?;

    let service = GroupService::new().await?;
    service.unlink_role(auth_user.tenant_id, id, role_id).await?;

    audit(
        &auth_user,
        "group.unlink_role",
        "group",
        Some(id),
        json!({ "role_id": role_id }),
    );

    Ok(ApiResponse::success(json!({ "group_id": id, "role_id": role_id })))
}
