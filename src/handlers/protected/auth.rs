use axum::extract::Extension;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};

use super::resolve_permissions;

/// GET /api/auth/whoami - Current user claims plus resolved permissions
pub async fn whoami(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    let permissions = resolve_permissions(&auth_user).await?;

    Ok(ApiResponse::success(json!({
        "user_id": auth_user.user_id,
        "email": auth_user.email,
        "tenant": auth_user.tenant,
        "tenant_id": auth_user.tenant_id,
        "access": auth_user.access,
        "permissions": permissions.into_vec(),
    })))
}
