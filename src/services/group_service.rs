use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::Group;
use crate::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Group not found")]
    NotFound,
    #[error("Group already exists: {0}")]
    AlreadyExists(String),
    #[error("{0} not found")]
    LinkTargetNotFound(&'static str),
}

impl From<sqlx::Error> for GroupError {
    fn from(err: sqlx::Error) -> Self {
        GroupError::Database(DatabaseError::Sqlx(err))
    }
}

impl From<GroupError> for ApiError {
    fn from(err: GroupError) -> Self {
        match err {
            GroupError::Database(e) => e.into(),
            GroupError::NotFound => ApiError::not_found("Group not found"),
            GroupError::AlreadyExists(name) => {
                ApiError::conflict(format!("Group already exists: {}", name))
            }
            GroupError::LinkTargetNotFound(what) => {
                ApiError::not_found(format!("{} not found", what))
            }
        }
    }
}

pub struct GroupService {
    pool: PgPool,
}

impl GroupService {
    pub async fn new() -> Result<Self, GroupError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    pub async fn create_group(
        &self,
        tenant_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Group, GroupError> {
        let exists: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM groups WHERE tenant_id = $1 AND name = $2 AND deleted_at IS NULL",
        )
        .bind(tenant_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        if exists.0 > 0 {
            return Err(GroupError::AlreadyExists(name.to_string()));
        }

        let group: Group = sqlx::query_as(
            r#"
            INSERT INTO groups (tenant_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;

        Ok(group)
    }

    pub async fn get_group(&self, tenant_id: Uuid, id: Uuid) -> Result<Group, GroupError> {
        let group: Option<Group> = sqlx::query_as(
            "SELECT * FROM groups WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        group.ok_or(GroupError::NotFound)
    }

    pub async fn list_groups(&self, tenant_id: Uuid) -> Result<Vec<Group>, GroupError> {
        let groups: Vec<Group> = sqlx::query_as(
            "SELECT * FROM groups WHERE tenant_id = $1 AND deleted_at IS NULL ORDER BY name",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    pub async fn update_group(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Group, GroupError> {
        let group: Option<Group> = sqlx::query_as(
            r#"
            UPDATE groups
            SET name = COALESCE($3, name),
                description = COALESCE($4, description),
                updated_at = now()
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?;

        group.ok_or(GroupError::NotFound)
    }

    pub async fn delete_group(&self, tenant_id: Uuid, id: Uuid) -> Result<Group, GroupError> {
        let group: Option<Group> = sqlx::query_as(
            r#"
            UPDATE groups
            SET deleted_at = now(), updated_at = now()
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        group.ok_or(GroupError::NotFound)
    }

    pub async fn add_member(
        &self,
        tenant_id: Uuid,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), GroupError> {
        self.get_group(tenant_id, group_id).await?;

        let user_exists: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        if user_exists.0 == 0 {
            return Err(GroupError::LinkTargetNotFound("User"));
        }

        sqlx::query(
            "INSERT INTO group_members (group_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(group_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn remove_member(
        &self,
        tenant_id: Uuid,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), GroupError> {
        self.get_group(tenant_id, group_id).await?;

        sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn link_role(
        &self,
        tenant_id: Uuid,
        group_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), GroupError> {
        self.get_group(tenant_id, group_id).await?;

        let role_exists: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM iam_roles
            WHERE id = $1 AND (tenant_id = $2 OR tenant_id IS NULL) AND deleted_at IS NULL
            "#,
        )
        .bind(role_id)
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        if role_exists.0 == 0 {
            return Err(GroupError::LinkTargetNotFound("Role"));
        }

        sqlx::query(
            "INSERT INTO group_roles (group_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(group_id)
        .bind(role_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn unlink_role(
        &self,
        tenant_id: Uuid,
        group_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), GroupError> {
        self.get_group(tenant_id, group_id).await?;

        sqlx::query("DELETE FROM group_roles WHERE group_id = $1 AND role_id = $2")
            .bind(group_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn member_ids(&self, group_id: Uuid) -> Result<Vec<Uuid>, GroupError> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM group_members WHERE group_id = $1")
                .bind(group_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn role_ids(&self, group_id: Uuid) -> Result<Vec<Uuid>, GroupError> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT role_id FROM group_roles WHERE group_id = $1")
                .bind(group_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
