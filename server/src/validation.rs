use serde_json::{Map, Value};

use crate::error::AppError;

pub const FEEDBACK_MIN_CHARS: usize = 10;
pub const FEEDBACK_MAX_CHARS: usize = 500;

/// `title` and `type` must both be present and truthy.
pub fn validate_resource_payload(body: &Map<String, Value>) -> Result<(), AppError> {
    let present = |key: &str| body.get(key).is_some_and(is_truthy);

    if present("title") && present("type") {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Resource title and type are required.".to_string(),
        ))
    }
}

/// Returns the trimmed text when its length is within bounds.
pub fn validate_feedback_text(text: Option<&str>) -> Result<String, AppError> {
    let trimmed = text.map(str::trim).unwrap_or_default();
    let length = trimmed.chars().count();

    if (FEEDBACK_MIN_CHARS..=FEEDBACK_MAX_CHARS).contains(&length) {
        Ok(trimmed.to_string())
    } else {
        Err(AppError::Validation(format!(
            "Feedback text must be between {FEEDBACK_MIN_CHARS} and {FEEDBACK_MAX_CHARS} characters long."
        )))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
