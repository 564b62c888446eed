//! Email validation tokens, password reset tokens, and the email ledger.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use homecloud_core::error::{AppError, ErrorKind};
use homecloud_core::result::AppResult;
use homecloud_entity::user::{EmailHistory, EmailToken, PasswordResetToken};

use crate::store::TokenStore;

/// Repository for one-shot account tokens.
#[derive(Debug, Clone)]
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    /// Create a new token repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for TokenRepository {
    async fn save_email_token(&self, token: &EmailToken) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO email_tokens (token, user_id, email, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&token.token)
        .bind(token.user_id)
        .bind(&token.email)
        .bind(token.created_at)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to save email token", e))?;
        Ok(())
    }

    async fn find_email_token(&self, token: &str) -> AppResult<Option<EmailToken>> {
        sqlx::query_as::<_, EmailToken>("SELECT * FROM email_tokens WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find email token", e))
    }

    async fn delete_email_tokens_for(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM email_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete email tokens", e)
            })?;
        Ok(())
    }

    async fn save_reset_token(&self, token: &PasswordResetToken) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (token, user_id, created_at, expires_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&token.token)
        .bind(token.user_id)
        .bind(token.created_at)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to save reset token", e))?;
        Ok(())
    }

    async fn find_reset_token(&self, token: &str) -> AppResult<Option<PasswordResetToken>> {
        sqlx::query_as::<_, PasswordResetToken>(
            "SELECT * FROM password_reset_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find reset token", e))
    }

    async fn delete_reset_tokens_for(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete reset tokens", e)
            })?;
        Ok(())
    }

    async fn record_email(&self, user_id: Uuid, email: &str, activated: bool) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO email_history (id, user_id, email, activated) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, email) \
             DO UPDATE SET activated = email_history.activated OR EXCLUDED.activated",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(email)
        .bind(activated)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record email", e))?;
        Ok(())
    }

    async fn email_history(&self, user_id: Uuid) -> AppResult<Vec<EmailHistory>> {
        sqlx::query_as::<_, EmailHistory>(
            "SELECT * FROM email_history WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load email history", e))
    }
}
