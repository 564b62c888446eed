//! Account lifecycle: registration, login, profile, email, and password.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use homecloud_auth::jwt::{AccessToken, JwtEncoder};
use homecloud_auth::password::{PasswordHasher, PasswordValidator};
use homecloud_auth::token::TokenGenerator;
use homecloud_core::config::AppConfig;
use homecloud_core::config::account::AccountConfig;
use homecloud_core::error::{AppError, codes};
use homecloud_core::result::AppResult;
use homecloud_core::types::pagination::{PageRequest, PageResponse};
use homecloud_database::Database;
use homecloud_entity::cloud::Owner;
use homecloud_entity::user::{
    CreateUser, EmailToken, PasswordResetToken, UpdateProfile, User, UserRole,
};

use crate::context::RequestContext;
use crate::mail::{MailMessage, Mailer};

/// Longest accepted nickname, in characters.
const MAX_NICK_CHARS: usize = 64;

/// Registration input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Initial language; the configured default when absent.
    pub language: Option<String>,
}

/// Manages user accounts.
#[derive(Debug, Clone)]
pub struct AccountService {
    db: Database,
    mailer: Arc<dyn Mailer>,
    hasher: PasswordHasher,
    validator: PasswordValidator,
    encoder: JwtEncoder,
    tokens: TokenGenerator,
    config: AccountConfig,
    root_prefix: String,
    public_url: String,
}

/// Check the username shape: 3–64 characters of `[A-Za-z0-9_.-]`.
pub fn validate_username(username: &str) -> AppResult<()> {
    let len = username.chars().count();
    if !(3..=64).contains(&len) {
        return Err(AppError::validation(
            "Username must be between 3 and 64 characters long",
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(AppError::validation(
            "Username may only contain letters, digits, '_', '.' and '-'",
        ));
    }
    if username.chars().all(|c| c == '.') {
        return Err(AppError::validation("Username cannot consist of dots only"));
    }
    Ok(())
}

fn validate_email(email: &str) -> AppResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::validation(format!("'{email}' is not a valid email address"))),
    }
}

fn invalid_token() -> AppError {
    AppError::validation("The link is invalid or has expired").with_code(codes::INVALID_TOKEN)
}

impl AccountService {
    pub fn new(db: Database, mailer: Arc<dyn Mailer>, config: &AppConfig) -> Self {
        Self {
            db,
            mailer,
            hasher: PasswordHasher::new(),
            validator: PasswordValidator::new(&config.auth),
            encoder: JwtEncoder::new(&config.auth),
            tokens: TokenGenerator::new(config.account.token_length),
            config: config.account.clone(),
            root_prefix: config.cloud.root_prefix.clone(),
            public_url: config.server.public_url.trim_end_matches('/').to_string(),
        }
    }

    async fn user(&self, id: Uuid) -> AppResult<User> {
        self.db.users.find_user_by_id(id).await?.ok_or_else(|| {
            AppError::not_found(format!("User {id} not found")).with_code(codes::USER_DOES_NOT_EXIST)
        })
    }

    fn ensure_language(&self, language: &str) -> AppResult<()> {
        if self.config.languages.iter().any(|l| l == language) {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "Unsupported language '{language}'. Available: {}",
                self.config.languages.join(", ")
            ))
            .with_code(codes::INVALID_LANGUAGE))
        }
    }

    fn ensure_not_throttled(&self, user: &User) -> AppResult<()> {
        if let Some(sent_at) = user.email_sent_at {
            let next_allowed = sent_at + Duration::seconds(self.config.email_cooldown_seconds);
            let now = Utc::now();
            if now < next_allowed {
                let wait = (next_allowed - now).num_seconds().max(1);
                return Err(AppError::rate_limit(format!(
                    "Validation emails are sent at most once every {} seconds; retry in {wait}s",
                    self.config.email_cooldown_seconds
                ))
                .with_code(codes::EMAIL_CHANGE_THROTTLED));
            }
        }
        Ok(())
    }

    /// Issue a fresh validation token for the user's current address and mail it.
    async fn send_validation_email(&self, user: &User) -> AppResult<()> {
        let now = Utc::now();
        let token = EmailToken {
            token: self.tokens.generate(),
            user_id: user.id,
            email: user.email.clone(),
            created_at: now,
            expires_at: now + Duration::minutes(self.config.email_token_ttl_minutes),
        };
        self.db.tokens.save_email_token(&token).await?;
        self.db.users.set_email_sent_at(user.id, now).await?;

        self.mailer
            .send(MailMessage {
                to: user.email.clone(),
                subject: "Confirm your email address".to_string(),
                body: format!(
                    "Hello {},\n\nConfirm this address by opening:\n{}/account/email/validate?token={}\n\n\
                     The link expires in {} minutes.",
                    user.display_name(),
                    self.public_url,
                    token.token,
                    self.config.email_token_ttl_minutes
                ),
            })
            .await?;
        debug!(user_id = %user.id, "Validation email issued");
        Ok(())
    }

    /// Create an account, its cloud namespace, and send the validation email.
    pub async fn register(&self, input: RegisterInput) -> AppResult<(User, AccessToken)> {
        let user = self.create_account(input, UserRole::User, false).await?;

        if let Err(e) = self.send_validation_email(&user).await {
            warn!(user_id = %user.id, error = %e, "Failed to send validation email");
        }

        let token = self.encoder.generate_access_token(&user)?;
        info!(user_id = %user.id, username = %user.username, "User registered");
        let user = self.user(user.id).await?;
        Ok((user, token))
    }

    /// Create an account and its cloud namespace without mailing anything.
    ///
    /// `email_validated` marks the address as already confirmed, for
    /// accounts set up by an administrator.
    pub async fn create_account(
        &self,
        input: RegisterInput,
        role: UserRole,
        email_validated: bool,
    ) -> AppResult<User> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_string();
        validate_username(&username)?;
        validate_email(&email)?;
        let language = input
            .language
            .unwrap_or_else(|| self.config.default_language.clone());
        self.ensure_language(&language)?;

        if self.db.users.find_user_by_username(&username).await?.is_some() {
            return Err(AppError::conflict(format!("Username '{username}' is already taken"))
                .with_code(codes::USERNAME_TAKEN));
        }
        if self.db.users.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::conflict(format!("Email '{email}' is already registered"))
                .with_code(codes::EMAIL_TAKEN));
        }
        self.validator
            .validate(&input.password, &[username.as_str(), email.as_str()])?;

        let user = self
            .db
            .users
            .create_user(&CreateUser {
                username,
                email,
                password_hash: self.hasher.hash_password(&input.password)?,
                language,
                role,
            })
            .await?;
        self.db
            .cloud
            .create_owner(&Owner::for_user(user.id, &user.username, &self.root_prefix))
            .await?;
        self.db
            .tokens
            .record_email(user.id, &user.email, email_validated)
            .await?;
        if email_validated {
            self.db.users.mark_email_validated(user.id).await?;
        }
        self.user(user.id).await
    }

    /// Authenticate by username or email.
    pub async fn login(&self, identifier: &str, password: &str) -> AppResult<(User, AccessToken)> {
        let identifier = identifier.trim();
        let found = if identifier.contains('@') {
            self.db.users.find_user_by_email(identifier).await?
        } else {
            self.db.users.find_user_by_username(identifier).await?
        };

        let user = match found {
            Some(user) if self.hasher.verify_password(password, &user.password_hash)? => user,
            _ => {
                debug!(identifier, "Login rejected");
                return Err(AppError::authentication("Invalid username or password")
                    .with_code(codes::INVALID_CREDENTIALS));
            }
        };

        self.db.users.record_login(user.id).await?;
        let token = self.encoder.generate_access_token(&user)?;
        info!(user_id = %user.id, "User logged in");
        Ok((user, token))
    }

    /// The caller's own account.
    pub async fn profile(&self, ctx: &RequestContext) -> AppResult<User> {
        self.user(ctx.user_id).await
    }

    /// Public lookup by username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<User> {
        self.db
            .users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("User '{username}' not found"))
                    .with_code(codes::USER_DOES_NOT_EXIST)
            })
    }

    pub async fn list_users(&self, page: &PageRequest) -> AppResult<PageResponse<User>> {
        self.db.users.list_users(page).await
    }

    /// Change nick and/or language.
    pub async fn update_profile(
        &self,
        ctx: &RequestContext,
        mut data: UpdateProfile,
    ) -> AppResult<User> {
        if let Some(language) = &data.language {
            self.ensure_language(language)?;
        }
        if let Some(nick) = data.nick.as_mut() {
            *nick = nick.trim().to_string();
            if nick.chars().count() > MAX_NICK_CHARS {
                return Err(AppError::validation(format!(
                    "Nickname must be at most {MAX_NICK_CHARS} characters"
                )));
            }
        }
        let user = self.db.users.update_profile(ctx.user_id, &data).await?;
        info!(user_id = %user.id, "Profile updated");
        Ok(user)
    }

    /// Switch to a new address, which then needs validating.
    ///
    /// Submitting the current address again only resends the validation
    /// email, and is refused once that address is validated.
    pub async fn change_email(&self, ctx: &RequestContext, new_email: &str) -> AppResult<User> {
        let new_email = new_email.trim();
        validate_email(new_email)?;
        let user = self.user(ctx.user_id).await?;

        if user.email.eq_ignore_ascii_case(new_email) {
            if user.email_validated {
                return Err(AppError::validation("This email address is already validated")
                    .with_code(codes::EMAIL_ALREADY_VALIDATED));
            }
            self.ensure_not_throttled(&user)?;
            self.send_validation_email(&user).await?;
            return self.user(user.id).await;
        }

        self.ensure_not_throttled(&user)?;
        if let Some(other) = self.db.users.find_user_by_email(new_email).await? {
            if other.id != user.id {
                return Err(AppError::conflict(format!(
                    "Email '{new_email}' is used by another account"
                ))
                .with_code(codes::EMAIL_TAKEN));
            }
        }

        self.db
            .tokens
            .record_email(user.id, &user.email, user.email_validated)
            .await?;
        self.db.tokens.delete_email_tokens_for(user.id).await?;
        let updated = self
            .db
            .users
            .set_email(user.id, new_email, false, user.email_sent_at)
            .await?;
        self.db.tokens.record_email(user.id, new_email, false).await?;
        self.send_validation_email(&updated).await?;

        info!(user_id = %user.id, "Email address changed");
        self.user(user.id).await
    }

    /// Send another validation email for the current address.
    pub async fn resend_validation(&self, ctx: &RequestContext) -> AppResult<()> {
        let user = self.user(ctx.user_id).await?;
        if user.email_validated {
            return Err(AppError::validation("This email address is already validated")
                .with_code(codes::EMAIL_ALREADY_VALIDATED));
        }
        self.ensure_not_throttled(&user)?;
        self.send_validation_email(&user).await
    }

    /// Consume a validation token and mark the current address validated.
    pub async fn validate_email(&self, ctx: &RequestContext, token: &str) -> AppResult<User> {
        let record = self
            .db
            .tokens
            .find_email_token(token)
            .await?
            .ok_or_else(invalid_token)?;
        let user = self.user(ctx.user_id).await?;

        if record.user_id != user.id
            || record.is_expired(Utc::now())
            || !record.email.eq_ignore_ascii_case(&user.email)
        {
            return Err(invalid_token());
        }

        self.db.users.mark_email_validated(user.id).await?;
        self.db.tokens.delete_email_tokens_for(user.id).await?;
        self.db.tokens.record_email(user.id, &user.email, true).await?;
        info!(user_id = %user.id, "Email address validated");
        self.user(user.id).await
    }

    /// Change the password after re-checking the current one.
    pub async fn change_password(
        &self,
        ctx: &RequestContext,
        old_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let user = self.user(ctx.user_id).await?;
        if !self.hasher.verify_password(old_password, &user.password_hash)? {
            return Err(AppError::validation("The current password is incorrect")
                .with_code(codes::INVALID_CREDENTIALS));
        }
        self.validator
            .validate(new_password, &[user.username.as_str(), user.email.as_str()])?;
        self.db
            .users
            .update_password(user.id, &self.hasher.hash_password(new_password)?)
            .await?;
        info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    /// Mail a reset link. Unknown addresses succeed silently.
    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        let Some(user) = self.db.users.find_user_by_email(email.trim()).await? else {
            debug!("Password reset requested for an unknown address");
            return Ok(());
        };

        let now = Utc::now();
        let token = PasswordResetToken {
            token: self.tokens.generate(),
            user_id: user.id,
            created_at: now,
            expires_at: now + Duration::minutes(self.config.password_reset_ttl_minutes),
        };
        self.db.tokens.delete_reset_tokens_for(user.id).await?;
        self.db.tokens.save_reset_token(&token).await?;
        self.mailer
            .send(MailMessage {
                to: user.email.clone(),
                subject: "Reset your password".to_string(),
                body: format!(
                    "Hello {},\n\nSet a new password by opening:\n{}/account/password-reset?token={}\n\n\
                     Ignore this message if you did not ask for a reset.",
                    user.display_name(),
                    self.public_url,
                    token.token
                ),
            })
            .await?;
        info!(user_id = %user.id, "Password reset requested");
        Ok(())
    }

    /// Set a new password with a reset token. Tokens are single-use.
    pub async fn confirm_password_reset(&self, token: &str, new_password: &str) -> AppResult<()> {
        let record = self
            .db
            .tokens
            .find_reset_token(token)
            .await?
            .ok_or_else(invalid_token)?;
        if record.is_expired(Utc::now()) {
            self.db.tokens.delete_reset_tokens_for(record.user_id).await?;
            return Err(invalid_token());
        }

        let user = self.user(record.user_id).await?;
        self.validator
            .validate(new_password, &[user.username.as_str(), user.email.as_str()])?;
        self.db
            .users
            .update_password(user.id, &self.hasher.hash_password(new_password)?)
            .await?;
        self.db.tokens.delete_reset_tokens_for(user.id).await?;
        info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        for ok in ["alice", "bob_1", "a.b-c", "X9z"] {
            validate_username(ok).unwrap();
        }
        for bad in ["ab", "has space", "slash/name", "ünï", "...", &"x".repeat(65)] {
            assert!(validate_username(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_email_shape() {
        validate_email("a@example.com").unwrap();
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@localhost").is_err());
    }
}
