use axum::extract::{Extension, Path};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::iam;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::rules::RuleEngine;
use crate::services::rule_service::{NewRule, RuleService};

use super::{audit, resolve_permissions};

/// GET /api/rules - Tenant rules plus global rules, in evaluation order
pub async fn list(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "rules:read")?;

    let service = RuleService::new().await?;
    let rules = service.list_rules(auth_user.tenant_id).await?;
    Ok(ApiResponse::success(json!(rules)))
}

#[derive(Debug, Deserialize)]
pub struct CreateRuleRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub condition: Value,
    pub actions: Value,
}

fn default_enabled() -> bool {
    true
}

/// POST /api/rules - Condition and actions are validated before storage
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateRuleRequest>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "rules:write")?;

    let service = RuleService::new().await?;
    let rule = service
        .create_rule(
            auth_user.tenant_id,
            NewRule {
                name: &payload.name,
                description: payload.description.as_deref(),
                priority: payload.priority,
                enabled: payload.enabled,
                condition: &payload.condition,
                actions: &payload.actions,
            },
        )
        .await?;

    audit(
        &auth_user,
        "rule.create",
        "rule",
        Some(rule.id),
        json!({ "name": rule.name, "priority": rule.priority }),
    );

    Ok(ApiResponse::created(json!(rule)))
}

/// GET /api/rules/:id
pub async fn get(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "rules:read")?;

    let service = RuleService::new().await?;
    let rule = service.get_rule(auth_user.tenant_id, id).await?;
    Ok(ApiResponse::success(json!(rule)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRuleRequest {
    pub description: Option<String>,
    pub priority: Option<i32>,
    pub enabled: Option<bool>,
    pub condition: Option<Value>,
    pub actions: Option<Value>,
}

/// PUT /api/rules/:id
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRuleRequest>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "rules:write")?;

    let service = RuleService::new().await?;
    let rule = service
        .update_rule(
            auth_user.tenant_id,
            id,
            payload.description.as_deref(),
            payload.priority,
            payload.enabled,
            payload.condition.as_ref(),
            payload.actions.as_ref(),
        )
        .await?;

    audit(
        &auth_user,
        "rule.update",
        "rule",
        Some(rule.id),
        json!({ "priority": rule.priority, "enabled": rule.enabled }),
    );

    Ok(ApiResponse::success(json!(rule)))
}

/// DELETE /api/rules/:id
pub async fn delete(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "rules:write")?;

    let service = RuleService::new().await?;
    let rule = service.delete_rule(auth_user.tenant_id, id).await?;

    audit(&auth_user, "rule.delete", "rule", Some(rule.id), json!({ "name": rule.name }));

    Ok(ApiResponse::success(json!(rule)))
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    /// Candidate business document to evaluate against the stored rules
    pub document: Value,
}

/// POST /api/rules/preview - Dry-run the engine against a supplied document
pub async fn preview(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<PreviewRequest>,
) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;
    iam::require(&permissions, "rules:read")?;

    let service = RuleService::new().await?;
    let rules = service.list_rules(auth_user.tenant_id).await?;
    let requirements = RuleEngine::evaluate(&rules, &payload.document)?;

    Ok(ApiResponse::success(json!(requirements)))
}
