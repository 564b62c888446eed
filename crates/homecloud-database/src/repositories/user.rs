//! User repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use homecloud_core::error::{AppError, ErrorKind, codes};
use homecloud_core::result::AppResult;
use homecloud_core::types::pagination::{PageRequest, PageResponse};
use homecloud_entity::user::{CreateUser, UpdateProfile, User};

use super::violated_constraint;
use crate::store::UserStore;

/// Repository for user CRUD and query operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_updated(&self, sql: &str, id: Uuid, what: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, format!("Failed to {what}"), e))?
            .ok_or_else(|| {
                AppError::not_found(format!("User {id} not found"))
                    .with_code(codes::USER_DOES_NOT_EXIST)
            })
    }

    async fn execute_for(
        &self,
        query: sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
        what: &str,
    ) -> AppResult<()> {
        query
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, format!("Failed to {what}"), e))?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn create_user(&self, data: &CreateUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, email, password_hash, language, role) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(&data.language)
        .bind(data.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match violated_constraint(&e) {
            Some("users_username_key") => {
                AppError::conflict(format!("Username '{}' is already taken", data.username))
                    .with_code(codes::USERNAME_TAKEN)
            }
            Some("users_email_key") => {
                AppError::conflict(format!("Email '{}' is already registered", data.email))
                    .with_code(codes::EMAIL_TAKEN)
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create user", e),
        })
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user by id", e))
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(username) = LOWER($1)")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find user by username", e)
            })
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find user by email", e)
            })
    }

    async fn list_users(&self, page: &PageRequest) -> AppResult<PageResponse<User>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count users", e))?;

        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY username ASC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list users", e))?;

        Ok(PageResponse::new(users, page.page, page.page_size, total as u64))
    }

    async fn update_profile(&self, id: Uuid, data: &UpdateProfile) -> AppResult<User> {
        // An empty nick clears the column; NULL parameters keep the old value.
        sqlx::query_as::<_, User>(
            "UPDATE users SET \
                nick = CASE WHEN $2::text IS NULL THEN nick ELSE NULLIF($2, '') END, \
                language = COALESCE($3, language), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(data.nick.as_deref())
        .bind(data.language.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update profile", e))?
        .ok_or_else(|| {
            AppError::not_found(format!("User {id} not found")).with_code(codes::USER_DOES_NOT_EXIST)
        })
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        self.execute_for(
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash),
            "update password",
        )
        .await
    }

    async fn set_email(
        &self,
        id: Uuid,
        email: &str,
        validated: bool,
        sent_at: Option<DateTime<Utc>>,
    ) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET email = $2, email_validated = $3, email_sent_at = $4, \
             updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(email)
        .bind(validated)
        .bind(sent_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match violated_constraint(&e) {
            Some("users_email_key") => {
                AppError::conflict(format!("Email '{email}' is already registered"))
                    .with_code(codes::EMAIL_TAKEN)
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to change email", e),
        })?
        .ok_or_else(|| {
            AppError::not_found(format!("User {id} not found")).with_code(codes::USER_DOES_NOT_EXIST)
        })
    }

    async fn mark_email_validated(&self, id: Uuid) -> AppResult<()> {
        self.fetch_updated(
            "UPDATE users SET email_validated = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *",
            id,
            "validate email",
        )
        .await
        .map(|_| ())
    }

    async fn set_email_sent_at(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        self.execute_for(
            sqlx::query("UPDATE users SET email_sent_at = $2 WHERE id = $1")
                .bind(id)
                .bind(at),
            "record email dispatch",
        )
        .await
    }

    async fn set_avatar_updated_at(&self, id: Uuid, at: Option<DateTime<Utc>>) -> AppResult<()> {
        self.execute_for(
            sqlx::query("UPDATE users SET avatar_updated_at = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(at),
            "update avatar",
        )
        .await
    }

    async fn record_login(&self, id: Uuid) -> AppResult<()> {
        self.execute_for(
            sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1").bind(id),
            "update last login",
        )
        .await
    }
}
