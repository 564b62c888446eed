//! Convenience result type alias for HomeCloud.

use crate::error::AppError;

/// A specialized `Result` type for HomeCloud operations.
pub type AppResult<T> = Result<T, AppError>;
