//! Unified application error types for HomeCloud.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. Every error carries a stable,
//! kebab-case `code` that clients can match on; the human-readable
//! `message` is free to change.

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested resource was not found.
    NotFound,
    /// Authentication failed or is missing.
    Authentication,
    /// The caller does not have permission to perform the action.
    Authorization,
    /// Input validation failed.
    Validation,
    /// A conflict occurred (duplicate account, etc.).
    Conflict,
    /// A rate limit or cooldown was hit.
    RateLimit,
    /// An internal server error occurred.
    Internal,
    /// A database error occurred.
    Database,
    /// A storage backend error occurred.
    Storage,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// The requested feature is not available in this build.
    NotImplemented,
}

impl ErrorKind {
    /// Default client-facing code for errors that do not set their own.
    pub fn default_code(&self) -> &'static str {
        match self {
            Self::NotFound => "not-found",
            Self::Authentication => "login-required",
            Self::Authorization => "permission-denied",
            Self::Validation => "validation-failed",
            Self::Conflict => "conflict",
            Self::RateLimit => "throttled",
            Self::Internal => "internal-error",
            Self::Database => "database-error",
            Self::Storage => "storage-error",
            Self::Configuration => "configuration-error",
            Self::Serialization => "serialization-error",
            Self::NotImplemented => "not-implemented",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Authentication => write!(f, "AUTHENTICATION"),
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Database => write!(f, "DATABASE"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::NotImplemented => write!(f, "NOT_IMPLEMENTED"),
        }
    }
}

/// Stable error codes returned in the `code` field of error responses.
pub mod codes {
    pub const FILE_DOES_NOT_EXIST: &str = "file-does-not-exist";
    pub const DIRECTORY_DOES_NOT_EXIST: &str = "directory-does-not-exist";
    pub const USER_DOES_NOT_EXIST: &str = "user-does-not-exist";
    pub const NO_READ_PERMISSION: &str = "no-read-permission";
    pub const NO_WRITE_PERMISSION: &str = "no-write-permission";
    pub const FILE_NOT_UPLOADED: &str = "file-not-uploaded";
    pub const CHECKSUM_MISMATCH: &str = "file-checksum-validation-failed";
    pub const DUPLICATE_OBJECT_NAME: &str = "duplicate-object-name";
    pub const ILLEGAL_OBJECT_NAME: &str = "illegal-object-name";
    pub const VIRTUAL_PATH_TOO_LONG: &str = "virtual-path-too-long";
    pub const INVALID_MOVE: &str = "invalid-move";
    pub const UPLOAD_TOO_LARGE: &str = "upload-too-large";
    pub const LOGIN_REQUIRED: &str = "login-required";
    pub const INVALID_CREDENTIALS: &str = "invalid-credentials";
    pub const USERNAME_TAKEN: &str = "username-taken";
    pub const EMAIL_TAKEN: &str = "email-taken";
    pub const EMAIL_ALREADY_VALIDATED: &str = "email-already-validated";
    pub const EMAIL_CHANGE_THROTTLED: &str = "email-change-throttled";
    pub const INVALID_TOKEN: &str = "invalid-token";
    pub const WEAK_PASSWORD: &str = "weak-password";
    pub const INVALID_LANGUAGE: &str = "invalid-language";
    pub const INVALID_IMAGE: &str = "invalid-image";
    pub const INVALID_CROP: &str = "invalid-crop";
    pub const AVATAR_NOT_UPLOADED: &str = "avatar-not-uploaded";
}

/// The unified application error used throughout HomeCloud.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Client-facing error code.
    pub code: Cow<'static, str>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: Cow::Borrowed(kind.default_code()),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            code: Cow::Borrowed(kind.default_code()),
            source: Some(Box::new(source)),
        }
    }

    /// Replace the client-facing code.
    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Cow::Borrowed(code);
        self
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// Create an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a rate-limit error.
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimit, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a not-implemented error.
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotImplemented, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            code: self.code.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
