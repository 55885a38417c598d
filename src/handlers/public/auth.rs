use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::audit::{AuditEvent, AuditLogger};
use crate::auth::{self, Claims};
use crate::config;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::tenant_service::TenantService;
use crate::services::user_service::{NewUser, UserService};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub tenant: String,
    pub email: String,
    pub password: String,
}

/// POST /auth/login - Authenticate user and receive JWT token
///
/// All failures (unknown tenant, unknown user, wrong password, inactive
/// account) are a uniform 401 so login errors leak nothing.
pub async fn login(Json(payload): Json<LoginRequest>) -> ApiResult<Value> {
    let tenant_service = TenantService::new().await?;
    let tenant = tenant_service
        .get_tenant(&payload.tenant)
        .await?
        .filter(|t| t.is_active)
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let user_service = UserService::new().await?;
    let user = user_service
        .find_for_login(tenant.id, &payload.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    auth::verify_password(&payload.password, &user.password_hash)
        .map_err(|_| ApiError::unauthorized("Invalid credentials"))?;

    let claims = Claims::new(
        tenant.name.clone(),
        tenant.id,
        user.id,
        user.email.clone(),
        user.access.clone(),
    );
    let expires_in = config::config().security.jwt_expiry_hours * 3600;
    let token = auth::generate_jwt(&claims)?;

    AuditLogger::record(AuditEvent::new(
        Some(tenant.id),
        Some(user.id),
        "auth.login",
        "session",
        None,
        json!({ "email": user.email }),
    ));

    Ok(ApiResponse::success(json!({
        "token": token,
        "user": user.to_api_output(),
        "expires_in": expires_in,
    })))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub tenant: String,
    pub email: String,
    pub name: String,
    pub password: String,
}

/// POST /auth/register - Self-service registration, pending activation.
/// New accounts always get the lowest access level.
pub async fn register(Json(payload): Json<RegisterRequest>) -> ApiResult<Value> {
    if payload.password.len() < 8 {
        return Err(ApiError::validation_error(
            "Password must be at least 8 characters",
            None,
        ));
    }

    let tenant_service = TenantService::new().await?;
    let tenant = tenant_service
        .get_tenant(&payload.tenant)
        .await?
        .filter(|t| t.is_active)
        .ok_or_else(|| ApiError::not_found("Tenant not found"))?;

    let user_service = UserService::new().await?;
    let user = user_service
        .create_user(
            tenant.id,
            NewUser {
                email: &payload.email,
                name: &payload.name,
                password: &payload.password,
                access: "member",
                is_active: false,
            },
        )
        .await?;

    AuditLogger::record(AuditEvent::new(
        Some(tenant.id),
        Some(user.id),
        "auth.register",
        "user",
        Some(user.id),
        json!({ "email": user.email }),
    ));

    // The activation token goes out via the notification service in the
    // full deployment; the response only confirms the pending state.
    Ok(ApiResponse::created(json!({
        "id": user.id,
        "email": user.email,
        "is_active": user.is_active,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub token: String,
}

/// PUT /auth/activate - Activate a registered account by token
pub async fn activate(Json(payload): Json<ActivateRequest>) -> ApiResult<Value> {
    let user_service = UserService::new().await?;
    let user = user_service
        .activate_user(&payload.token)
        .await
        .map_err(|_| ApiError::not_found("Invalid activation token"))?;

    AuditLogger::record(AuditEvent::new(
        Some(user.tenant_id),
        Some(user.id),
        "auth.activate",
        "user",
        Some(user.id),
        json!({}),
    ));

    Ok(ApiResponse::success(user.to_api_output()))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub token: String,
}

/// POST /auth/refresh - Exchange a still-valid token for a fresh one
pub async fn refresh(Json(payload): Json<RefreshRequest>) -> ApiResult<Value> {
    let claims = auth::validate_jwt(&payload.token)?;

    let fresh = Claims::new(
        claims.tenant,
        claims.tenant_id,
        claims.user_id,
        claims.email,
        claims.access,
    );
    let expires_in = config::config().security.jwt_expiry_hours * 3600;
    let token = auth::generate_jwt(&fresh)?;

    Ok(ApiResponse::success(json!({
        "token": token,
        "expires_in": expires_in,
    })))
}
