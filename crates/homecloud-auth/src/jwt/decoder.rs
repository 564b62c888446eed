//! JWT access token validation.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use homecloud_core::config::auth::AuthConfig;
use homecloud_core::error::{AppError, codes};

use super::claims::Claims;

/// Verifies signature and expiry of access tokens.
#[derive(Clone)]
pub struct JwtDecoder {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5; // seconds of clock skew

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decode and validate an access token string.
    pub fn decode_access_token(&self, token: &str) -> Result<Claims, AppError> {
        let unauthorized =
            |message: String| AppError::authentication(message).with_code(codes::LOGIN_REQUIRED);

        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    unauthorized("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    unauthorized("Invalid token signature".to_string())
                }
                _ => unauthorized(format!("Token validation failed: {e}")),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::JwtEncoder;
    use chrono::Utc;
    use homecloud_entity::user::{User, UserRole};
    use uuid::Uuid;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            email_validated: false,
            email_sent_at: None,
            password_hash: String::new(),
            nick: None,
            language: "en".to_string(),
            avatar_updated_at: None,
            role: UserRole::User,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    #[test]
    fn test_round_trip() {
        let config = AuthConfig::default();
        let user = user();
        let token = JwtEncoder::new(&config).generate_access_token(&user).unwrap();
        let claims = JwtDecoder::new(&config)
            .decode_access_token(&token.access_token)
            .unwrap();
        assert_eq!(claims.user_id(), user.id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, UserRole::User);
        assert_eq!(claims.expires_at().timestamp(), token.expires_at.timestamp());
    }

    #[test]
    fn test_rejects_foreign_signature_and_garbage() {
        let token = JwtEncoder::new(&AuthConfig::default())
            .generate_access_token(&user())
            .unwrap();
        let other = AuthConfig {
            jwt_secret: "another-secret".to_string(),
            ..AuthConfig::default()
        };
        let err = JwtDecoder::new(&other)
            .decode_access_token(&token.access_token)
            .unwrap_err();
        assert_eq!(err.code, codes::LOGIN_REQUIRED);
        assert!(JwtDecoder::new(&other).decode_access_token("abc").is_err());
    }
}
