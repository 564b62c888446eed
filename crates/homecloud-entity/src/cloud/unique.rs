//! Sibling uniqueness.
//!
//! Two nodes under the same parent and owner may not share a virtual path.
//! The comparison is case-sensitive and ignores the trailing `/` that
//! marks directories, so a file `docs` clashes with a directory `docs/`.

use homecloud_core::error::codes;
use homecloud_core::{AppError, AppResult};

use super::path::normalize;

/// Fail with `duplicate-object-name` when `candidate` equals any sibling path.
pub fn ensure_unique<'a>(
    candidate: &str,
    siblings: impl IntoIterator<Item = &'a str>,
) -> AppResult<()> {
    let wanted = normalize(candidate);
    if siblings.into_iter().any(|s| normalize(s) == wanted) {
        return Err(AppError::validation(format!(
            "An object named '{}' already exists here",
            wanted.rsplit('/').next().unwrap_or(wanted)
        ))
        .with_code(codes::DUPLICATE_OBJECT_NAME));
    }
    Ok(())
}
