use axum::extract::{Extension, Path, Query};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::iam;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::rules::RuleEngine;
use crate::services::business_service::{BusinessService, NewBusiness};
use crate::services::rule_service::RuleService;

use super::{audit, page, resolve_permissions};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/businesses
pub async fn list(
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "businesses:read")?;

    let (limit, offset) = page(query.limit, query.offset);
    let service = BusinessService::new().await?;
    let businesses = service.list_businesses(auth_user.tenant_id, limit, offset).await?;
    Ok(ApiResponse::success(json!(businesses)))
}

#[derive(Debug, Deserialize)]
pub struct CreateBusinessRequest {
    pub name: String,
    pub entity_type: String,
    pub formation_state: String,
    pub attributes: Option<Value>,
}

/// POST /api/businesses
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateBusinessRequest>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "businesses:write")?;

    let service = BusinessService::new().await?;
    let business = service
        .create_business(
            auth_user.tenant_id,
            NewBusiness {
                name: &payload.name,
                entity_type: &payload.entity_type,
                formation_state: &payload.formation_state,
                attributes: payload.attributes.as_ref(),
            },
        )
        .await?;

    audit(
        &auth_user,
        "business.create",
        "business",
        Some(business.id),
        json!({ "name": business.name, "entity_type": business.entity_type }),
    );

    Ok(ApiResponse::created(json!(business)))
}

/// GET /api/businesses/:id
pub async fn get(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "businesses:read")?;

    let service = BusinessService::new().await?;
    let business = service.get_business(auth_user.tenant_id, id).await?;
    Ok(ApiResponse::success(json!(business)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBusinessRequest {
    pub name: Option<String>,
    pub status: Option<String>,
    pub attributes: Option<Value>,
}

/// PUT /api/businesses/:id
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBusinessRequest>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "businesses:write")?;

    let service = BusinessService::new().await?;
    let business = service
        .update_business(
            auth_user.tenant_id,
            id,
            payload.name.as_deref(),
            payload.status.as_deref(),
            payload.attributes.as_ref(),
        )
        .await?;

    audit(
        &auth_user,
        "business.update",
        "business",
        Some(business.id),
        json!({ "status": business.status }),
    );

    Ok(ApiResponse::success(json!(business)))
}

/// DELETE /api/businesses/:id
pub async fn delete(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "businesses:write")?;

    let service = BusinessService::new().await?;
    let business = service.delete_business(auth_user.tenant_id, id).await?;

    audit(
        &auth_user,
        "business.delete",
        "business",
        Some(business.id),
        json!({ "name": business.name }),
    );

    Ok(ApiResponse::success(json!(business)))
}

/// GET /api/businesses/:id/requirements - Run the rule engine against this
/// business and return the workflow requirements it currently triggers
pub async fn requirements(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "businesses:read")?;

    let business_service = BusinessService::new().await?;
    let business = business_service.get_business(auth_user.tenant_id, id).await?;

    let rule_service = RuleService::new().await?;
    let rules = rule_service.list_rules(auth_user.tenant_id).await?;

    let document = business.to_document();
    let requirements = RuleEngine::evaluate(&rules, &document)?;

    Ok(ApiResponse::success(json!({
        "business_id": business.id,
        "requirements": requirements,
    })))
}
