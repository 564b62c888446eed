//! Node name rules.

use homecloud_core::error::codes;
use homecloud_core::{AppError, AppResult};
use rand::Rng;
use rand::distr::Alphanumeric;

/// Characters never allowed in a display name.
pub const ILLEGAL_CHARACTERS: &[char] = &['/', '\\', '*', '?', '!', '<', '>', '|'];

/// Length of the random suffix used to disambiguate stored names.
const SUFFIX_LEN: usize = 5;

/// Validate a display name supplied by a user.
pub fn validate_virtual_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(
            AppError::validation("Name cannot be empty").with_code(codes::ILLEGAL_OBJECT_NAME)
        );
    }
    if name == "." || name == ".." {
        return Err(AppError::validation(format!("'{name}' is a reserved name"))
            .with_code(codes::ILLEGAL_OBJECT_NAME));
    }
    if let Some(c) = name.chars().find(|c| ILLEGAL_CHARACTERS.contains(c) || c.is_control()) {
        return Err(
            AppError::validation(format!("Name contains illegal character '{c}'"))
                .with_code(codes::ILLEGAL_OBJECT_NAME),
        );
    }
    Ok(())
}

/// Validate the length of a fully resolved virtual path.
pub fn validate_virtual_path_length(virtual_path: &str, max_chars: usize) -> AppResult<()> {
    let len = virtual_path.trim_end_matches('/').chars().count();
    if len > max_chars {
        return Err(AppError::validation(format!(
            "Virtual path is {len} characters long, the limit is {max_chars}"
        ))
        .with_code(codes::VIRTUAL_PATH_TOO_LONG));
    }
    Ok(())
}

/// Insert `_suffix` between the stem and the extension of `name`.
///
/// `report.pdf` becomes `report_ab12c.pdf`; `notes` becomes `notes_ab12c`.
pub fn with_suffix(name: &str, suffix: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{suffix}.{ext}"),
        _ => format!("{name}_{suffix}"),
    }
}

/// Random alphanumeric suffix.
pub fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect()
}

/// Pick a stored name for `virtual_name` that none of `taken` uses.
pub fn available_stored_name<'a>(
    virtual_name: &str,
    taken: impl IntoIterator<Item = &'a str> + Clone,
) -> String {
    let is_taken = |candidate: &str| taken.clone().into_iter().any(|t| t == candidate);
    if !is_taken(virtual_name) {
        return virtual_name.to_string();
    }
    loop {
        let candidate = with_suffix(virtual_name, &random_suffix());
        if !is_taken(&candidate) {
            return candidate;
        }
    }
}
