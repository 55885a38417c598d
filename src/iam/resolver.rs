use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::iam::permissions::{legacy_access_permissions, PermissionSet};

/// Aggregates a user's effective permissions from three sources:
/// the legacy access level on the user row, roles assigned directly to
/// the user, and roles inherited through group membership. The results
/// are unioned into a single `PermissionSet`.
///
/// Roles apply when they belong to the user's tenant or are global
/// (`tenant_id IS NULL`). Soft-deleted roles, groups and links are ignored.
pub struct PermissionResolver {
    pool: PgPool,
}

impl PermissionResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn resolve(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<PermissionSet, DatabaseError> {
        let mut set = self.legacy_permissions(user_id).await?;

        for permissions in self.assigned_role_permissions(tenant_id, user_id).await? {
            set.extend(permissions);
        }

        for permissions in self.group_role_permissions(tenant_id, user_id).await? {
            set.extend(permissions);
        }

        tracing::debug!(
            user_id = %user_id,
            permission_count = set.len(),
            "Resolved effective permissions"
        );

        Ok(set)
    }

    /// Source 1: baseline set implied by the user's legacy access level
    async fn legacy_permissions(&self, user_id: Uuid) -> Result<PermissionSet, DatabaseError> {
        let access: Option<(String,)> =
            sqlx::query_as("SELECT access FROM users WHERE id = $1 AND deleted_at IS NULL")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(access
            .map(|(a,)| legacy_access_permissions(&a))
            .unwrap_or_default())
    }

    /// Source 2: roles assigned directly via user_roles
    async fn assigned_role_permissions(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Vec<String>>, DatabaseError> {
        let rows: Vec<(Vec<String>,)> = sqlx::query_as(
            r#"
            SELECT r.permissions
            FROM user_roles ur
            JOIN iam_roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1
              AND (r.tenant_id = $2 OR r.tenant_id IS NULL)
              AND r.deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(p,)| p).collect())
    }

    /// Source 3: roles inherited through group membership
    async fn group_role_permissions(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Vec<String>>, DatabaseError> {
        let rows: Vec<(Vec<String>,)> = sqlx::query_as(
            r#"
            SELECT r.permissions
            FROM group_members gm
            JOIN groups g ON g.id = gm.group_id AND g.deleted_at IS NULL
            JOIN group_roles gr ON gr.group_id = gm.group_id
            JOIN iam_roles r ON r.id = gr.role_id
            WHERE gm.user_id = $1
              AND g.tenant_id = $2
              AND (r.tenant_id = $2 OR r.tenant_id IS NULL)
              AND r.deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(p,)| p).collect())
    }
}
