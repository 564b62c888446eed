//! Password policy enforcement for new passwords.

use homecloud_core::config::auth::AuthConfig;
use homecloud_core::error::{AppError, codes};

/// Validates password strength against the configured policy.
#[derive(Debug, Clone)]
pub struct PasswordValidator {
    min_length: usize,
    strength_check: bool,
}

fn weak(message: impl Into<String>) -> AppError {
    AppError::validation(message).with_code(codes::WEAK_PASSWORD)
}

impl PasswordValidator {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            min_length: config.password_min_length,
            strength_check: config.password_strength_check,
        }
    }

    /// Validates a password, returning the first violation found.
    ///
    /// `user_inputs` are account attributes (username, email) the password
    /// must not be derived from.
    pub fn validate(&self, password: &str, user_inputs: &[&str]) -> Result<(), AppError> {
        if password.chars().count() < self.min_length {
            return Err(weak(format!(
                "Password must be at least {} characters long",
                self.min_length
            )));
        }

        if password.chars().all(|c| c.is_ascii_digit()) {
            return Err(weak("Password cannot be entirely numeric"));
        }

        let lowered = password.to_lowercase();
        for input in user_inputs.iter().filter(|i| i.len() >= 3) {
            let input = input.to_lowercase();
            let local = input.split('@').next().unwrap_or(&input);
            if lowered == input || lowered == local {
                return Err(weak("Password is too similar to your account details"));
            }
        }

        if self.strength_check {
            let estimate = zxcvbn::zxcvbn(password, user_inputs);
            if estimate.score() < zxcvbn::Score::Two {
                return Err(weak(
                    "Password is too easy to guess. Please use a longer or less common password.",
                ));
            }
        }

        Ok(())
    }
}
