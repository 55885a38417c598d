pub mod permissions;
pub mod resolver;

pub use permissions::PermissionSet;
pub use resolver::PermissionResolver;

use crate::error::ApiError;

/// Handler-side enforcement: 403 unless the resolved set allows `permission`
pub fn require(set: &PermissionSet, permission: &str) -> Result<(), ApiError> {
    if set.allows(permission) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "Missing required permission: {}",
            permission
        )))
    }
}
