//! Validation helpers for DTOs.

use validator::ValidationError;

/// Filter values meaning "no restriction".
const WILDCARDS: [&str; 3] = ["any", "none", "-"];
const DIFFICULTIES: [&str; 3] = ["easy", "medium", "hard"];
const QUESTION_TYPES: [&str; 2] = ["multiple", "boolean"];

/// Map the wildcard spellings to an empty filter, keep anything else trimmed.
///
/// ```ignore
/// normalize_filter("Any")   // ""
/// normalize_filter(" 9 ")   // "9"
/// ```
pub fn normalize_filter(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || is_wildcard(trimmed) {
        String::new()
    } else {
        trimmed.to_string()
    }
}

fn is_wildcard(value: &str) -> bool {
    WILDCARDS
        .iter()
        .any(|wildcard| value.eq_ignore_ascii_case(wildcard))
}

fn one_of(value: &str, allowed: &[&str], code: &'static str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty()
        || is_wildcard(value)
        || allowed.iter().any(|item| value.eq_ignore_ascii_case(item))
    {
        return Ok(());
    }

    let mut err = ValidationError::new(code);
    err.message = Some(
        format!(
            "`{value}` is not one of {} (or any/none/-)",
            allowed.join(", ")
        )
        .into(),
    );
    Err(err)
}

/// Validates a difficulty filter: `easy`, `medium`, `hard` or a wildcard.
pub fn validate_difficulty(value: &str) -> Result<(), ValidationError> {
    one_of(value, &DIFFICULTIES, "difficulty")
}

/// Validates a question type filter: `multiple`, `boolean` or a wildcard.
pub fn validate_question_type(value: &str) -> Result<(), ValidationError> {
    one_of(value, &QUESTION_TYPES, "question_type")
}

/// Rejects text that is empty once trimmed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("value must not be blank".into());
        return Err(err);
    }
    Ok(())
}
