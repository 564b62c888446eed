//! Account lifecycle configuration: tokens, email validation, avatars.

use serde::{Deserialize, Serialize};

/// Account settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Length of generated email validation and password reset tokens.
    #[serde(default = "default_token_length")]
    pub token_length: usize,
    /// Email validation token lifetime in minutes.
    #[serde(default = "default_email_token_ttl")]
    pub email_token_ttl_minutes: i64,
    /// Minimum delay between two validation emails, in seconds.
    #[serde(default = "default_email_cooldown")]
    pub email_cooldown_seconds: i64,
    /// Password reset token lifetime in minutes.
    #[serde(default = "default_reset_ttl")]
    pub password_reset_ttl_minutes: i64,
    /// Selectable profile languages.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    /// Language assigned at registration.
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Base URL for static assets (default avatar).
    #[serde(default = "default_static_url")]
    pub static_url: String,
    /// Avatar processing limits.
    #[serde(default)]
    pub avatar: AvatarConfig,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            token_length: default_token_length(),
            email_token_ttl_minutes: default_email_token_ttl(),
            email_cooldown_seconds: default_email_cooldown(),
            password_reset_ttl_minutes: default_reset_ttl(),
            languages: default_languages(),
            default_language: default_language(),
            static_url: default_static_url(),
            avatar: AvatarConfig::default(),
        }
    }
}

/// Pixel and byte bound for one avatar rendition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AvatarSizeLimit {
    /// Longest edge in pixels.
    pub pixels: u32,
    /// Maximum encoded size in bytes.
    pub max_bytes: usize,
}

/// Avatar limits per rendition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarConfig {
    #[serde(default = "default_original")]
    pub original: AvatarSizeLimit,
    #[serde(default = "default_large")]
    pub large: AvatarSizeLimit,
    #[serde(default = "default_middle")]
    pub middle: AvatarSizeLimit,
    #[serde(default = "default_small")]
    pub small: AvatarSizeLimit,
    /// Lowest accepted width/height ratio of a crop box.
    #[serde(default = "default_min_ratio")]
    pub min_aspect_ratio: f64,
}

impl AvatarConfig {
    /// Highest accepted width/height ratio of a crop box.
    pub fn max_aspect_ratio(&self) -> f64 {
        1.0 / self.min_aspect_ratio
    }
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            original: default_original(),
            large: default_large(),
            middle: default_middle(),
            small: default_small(),
            min_aspect_ratio: default_min_ratio(),
        }
    }
}

fn default_token_length() -> usize {
    32
}

fn default_email_token_ttl() -> i64 {
    15
}

fn default_email_cooldown() -> i64 {
    60
}

fn default_reset_ttl() -> i64 {
    60 * 24
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string(), "zh-hans".to_string()]
}

fn default_language() -> String {
    "en".to_string()
}

fn default_static_url() -> String {
    "/static/".to_string()
}

fn default_original() -> AvatarSizeLimit {
    AvatarSizeLimit {
        pixels: 2048,
        max_bytes: 5 * 1024 * 1024,
    }
}

fn default_large() -> AvatarSizeLimit {
    AvatarSizeLimit {
        pixels: 256,
        max_bytes: 512 * 1024,
    }
}

fn default_middle() -> AvatarSizeLimit {
    AvatarSizeLimit {
        pixels: 128,
        max_bytes: 200 * 1024,
    }
}

fn default_small() -> AvatarSizeLimit {
    AvatarSizeLimit {
        pixels: 64,
        max_bytes: 75 * 1024,
    }
}

fn default_min_ratio() -> f64 {
    0.618
}
