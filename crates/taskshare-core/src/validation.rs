//! Input checks applied before anything is sent to the server.

use crate::category::{CategoryDraft, CategoryRegistry, DEFAULT_CATEGORY_NAME};
use crate::error::{Result, TaskShareError};

pub const MAX_TITLE_LEN: usize = 40;
pub const MAX_DESCRIPTION_LEN: usize = 128;
pub const MAX_CATEGORY_NAME_LEN: usize = 14;

/// Title: required, at most 40 characters.
pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(TaskShareError::validation("title", "must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(TaskShareError::validation(
            "title",
            format!("must be at most {} characters", MAX_TITLE_LEN),
        ));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<()> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(TaskShareError::validation(
            "description",
            format!("must be at most {} characters", MAX_DESCRIPTION_LEN),
        ));
    }
    Ok(())
}

/// `#rrggbb`
pub fn validate_color(field: &str, color: &str) -> Result<()> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(TaskShareError::validation(
            field,
            format!("'{}' is not a #rrggbb colour", color),
        ));
    }
    Ok(())
}

/// Validates a category draft against the registry it would join.
///
/// `renaming` is the id of the category being edited, which may keep its own
/// name.
pub fn validate_category(
    draft: &CategoryDraft,
    registry: &CategoryRegistry,
    renaming: Option<i64>,
) -> Result<()> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(TaskShareError::validation("category name", "must not be empty"));
    }
    if name.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(TaskShareError::validation(
            "category name",
            format!("must be at most {} characters", MAX_CATEGORY_NAME_LEN),
        ));
    }
    if name == DEFAULT_CATEGORY_NAME {
        return Err(TaskShareError::validation(
            "category name",
            format!("'{}' is reserved", DEFAULT_CATEGORY_NAME),
        ));
    }
    if let Some(existing) = registry.find_by_name(name) {
        if Some(existing.id) != renaming {
            return Err(TaskShareError::validation(
                "category name",
                format!("'{}' already exists", name),
            ));
        }
    }
    validate_color("header colour", &draft.header_color)?;
    validate_color("body colour", &draft.body_color)
}

/// Username and password for register/login.
pub fn validate_credentials(username: &str, password: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(TaskShareError::validation("username", "must not be empty"));
    }
    if password.is_empty() {
        return Err(TaskShareError::validation("password", "must not be empty"));
    }
    Ok(())
}

/// Share target: non-empty and not the task owner.
pub fn validate_share_target(target: &str, owner: &str) -> Result<()> {
    if target.trim().is_empty() {
        return Err(TaskShareError::validation("share target", "must not be empty"));
    }
    if target == owner {
        return Err(TaskShareError::validation(
            "share target",
            "cannot share a task with its owner",
        ));
    }
    Ok(())
}
