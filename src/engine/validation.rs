use crate::error::TaskrankError;
use crate::models::{MAX_USER_PRIORITY, MIN_USER_PRIORITY};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_CATEGORY_LEN: usize = 50;

pub fn validate_title(title: &str) -> Result<String, TaskrankError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskrankError::validation("Task title must not be empty"));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(TaskrankError::validation(format!(
            "Task title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_priority(priority: i32) -> Result<i32, TaskrankError> {
    if !(MIN_USER_PRIORITY..=MAX_USER_PRIORITY).contains(&priority) {
        return Err(TaskrankError::validation(format!(
            "Priority must be between {MIN_USER_PRIORITY} and {MAX_USER_PRIORITY}, got {priority}"
        )));
    }
    Ok(priority)
}

pub fn validate_category(category: &str) -> Result<String, TaskrankError> {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        return Err(TaskrankError::validation("Category name must not be empty"));
    }
    if trimmed.chars().count() > MAX_CATEGORY_LEN {
        return Err(TaskrankError::validation(format!(
            "Category name must be at most {MAX_CATEGORY_LEN} characters"
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(TaskrankError::validation(
            "Category name must not contain control characters",
        ));
    }
    Ok(trimmed.to_string())
}

/// Validate an optional category, treating blank input as "no category".
pub fn normalize_category(category: Option<&str>) -> Result<Option<String>, TaskrankError> {
    match category {
        Some(c) if !c.trim().is_empty() => validate_category(c).map(Some),
        _ => Ok(None),
    }
}

/// Trim names, drop blanks and repeats, keep first-seen order.
pub fn normalize_people(people: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(people.len());
    for p in people {
        let p = p.trim();
        if !p.is_empty() && !out.iter().any(|seen| seen == p) {
            out.push(p.to_string());
        }
    }
    out
}
