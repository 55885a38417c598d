use sqlx::PgPool;
use uuid::Uuid;

use crate::auth;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::User;
use crate::error::ApiError;

pub const ACCESS_LEVELS: &[&str] = &["root", "admin", "advisor", "member"];

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("User not found")]
    NotFound,
    #[error("Email already registered: {0}")]
    EmailTaken(String),
    #[error("Invalid access level: {0}")]
    InvalidAccess(String),
    #[error("Invalid email: {0}")]
    InvalidEmail(String),
    #[error(transparent)]
    Auth(#[from] auth::AuthError),
}

impl From<sqlx::Error> for UserError {
    fn from(err: sqlx::Error) -> Self {
        UserError::Database(DatabaseError::Sqlx(err))
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Database(e) => e.into(),
            UserError::NotFound => ApiError::not_found("User not found"),
            UserError::EmailTaken(email) => {
                ApiError::conflict(format!("Email already registered: {}", email))
            }
            UserError::InvalidAccess(msg) => {
                ApiError::validation_error(format!("Invalid access level: {}", msg), None)
            }
            UserError::InvalidEmail(msg) => ApiError::validation_error(msg, None),
            UserError::Auth(e) => e.into(),
        }
    }
}

pub struct UserService {
    pool: PgPool,
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub password: &'a str,
    pub access: &'a str,
    /// Active immediately (admin-created) or pending activation (self-registered)
    pub is_active: bool,
}

impl UserService {
    pub async fn new() -> Result<Self, UserError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    pub async fn create_user(&self, tenant_id: Uuid, new: NewUser<'_>) -> Result<User, UserError> {
        Self::validate_email(new.email)?;
        Self::validate_access(new.access)?;

        if self.email_exists(tenant_id, new.email).await? {
            return Err(UserError::EmailTaken(new.email.to_string()));
        }

        let password_hash = auth::hash_password(new.password)?;
        let activation_token = if new.is_active {
            None
        } else {
            Some(auth::generate_activation_token())
        };

        let user: User = sqlx::query_as(
            r#"
            INSERT INTO users (tenant_id, email, name, password_hash, access, is_active, activation_token)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(new.email)
        .bind(new.name)
        .bind(&password_hash)
        .bind(new.access)
        .bind(new.is_active)
        .bind(&activation_token)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    fn validate_access(access: &str) -> Result<(), UserError> {
        if ACCESS_LEVELS.contains(&access) {
            Ok(())
        } else {
            Err(UserError::InvalidAccess(access.to_string()))
        }
    }

    fn validate_email(email: &str) -> Result<(), UserError> {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
            return Err(UserError::InvalidEmail(format!("Invalid email format: {}", email)));
        }
        Ok(())
    }

    async fn email_exists(&self, tenant_id: Uuid, email: &str) -> Result<bool, UserError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE tenant_id = $1 AND email = $2 AND deleted_at IS NULL",
        )
        .bind(tenant_id)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }

    pub async fn get_user(&self, tenant_id: Uuid, id: Uuid) -> Result<User, UserError> {
        let user: Option<User> = sqlx::query_as(
            "SELECT * FROM users WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or(UserError::NotFound)
    }

    /// Lookup for login: active users only, no tenant scoping by id since
    /// login identifies the tenant by name first
    pub async fn find_for_login(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> Result<Option<User>, UserError> {
        let user: Option<User> = sqlx::query_as(
            r#"
            SELECT * FROM users
            WHERE tenant_id = $1 AND email = $2 AND is_active = true AND deleted_at IS NULL
            "#,
        )
        .bind(tenant_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn list_users(
        &self,
        tenant_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, UserError> {
        let users: Vec<User> = sqlx::query_as(
            r#"
            SELECT * FROM users
            WHERE tenant_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn update_user(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        name: Option<&str>,
        access: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<User, UserError> {
        if let Some(access) = access {
            Self::validate_access(access)?;
        }

        let user: Option<User> = sqlx::query_as(
            r#"
            UPDATE users
            SET name = COALESCE($3, name),
                access = COALESCE($4, access),
                is_active = COALESCE($5, is_active),
                updated_at = now()
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(name)
        .bind(access)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or(UserError::NotFound)
    }

    pub async fn delete_user(&self, tenant_id: Uuid, id: Uuid) -> Result<User, UserError> {
        let user: Option<User> = sqlx::query_as(
            r#"
            UPDATE users
            SET deleted_at = now(), is_active = false, updated_at = now()
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or(UserError::NotFound)
    }

    /// Flip a pending registration to active, consuming its token
    pub async fn activate_user(&self, token: &str) -> Result<User, UserError> {
        let user: Option<User> = sqlx::query_as(
            r#"
            UPDATE users
            SET is_active = true, activation_token = NULL, updated_at = now()
            WHERE activation_token = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or(UserError::NotFound)
    }

    pub async fn assign_role(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), UserError> {
        // Ensure both sides exist in this tenant before linking
        self.get_user(tenant_id, user_id).await?;

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
            return Err(UserError::Database(DatabaseError::NotFound(
                "Role not found".to_string(),
            )));
        }

        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn remove_role(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), UserError> {
        self.get_user(tenant_id, user_id).await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Role ids assigned directly to a user (for whoami / user detail)
    pub async fn assigned_role_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, UserError> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT role_id FROM user_roles WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_access_levels() {
        assert!(UserService::validate_access("admin").is_ok());
        assert!(UserService::validate_access("member").is_ok());
        assert!(UserService::validate_access("superuser").is_err());
        assert!(UserService::validate_access("").is_err());
    }

    #[test]
    fn validates_emails() {
        assert!(UserService::validate_email("a@b.co").is_ok());
        assert!(UserService::validate_email("no-at-sign").is_err());
        assert!(UserService::validate_email("@b.co").is_err());
        assert!(UserService::validate_email("a@nodot").is_err());
    }
}
