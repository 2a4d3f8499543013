//! Post field rules shared by the create and update paths.

use super::entities::PostId;
use super::error::DomainError;

/// Activity label recorded when a post is created.
pub const NEW_POST_ACTION: &str = "new_post";

/// Reject blank values for required text fields.
pub fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("`{field}` must not be empty")));
    }
    Ok(())
}

/// Identifiers are assigned by a sequence starting at 1.
pub fn ensure_valid_id(id: PostId) -> Result<(), DomainError> {
    if id <= 0 {
        return Err(DomainError::validation(format!(
            "post id must be positive, got {id}"
        )));
    }
    Ok(())
}

/// Trim tags, drop blanks and duplicates. First occurrence wins so the
/// caller's ordering is kept for display.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let trimmed = tag.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if normalized.iter().any(|existing| existing == trimmed) {
            continue;
        }
        normalized.push(trimmed.to_string());
    }
    normalized
}
