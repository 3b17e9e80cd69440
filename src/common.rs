/// Input normalization shared across handlers, services and commands
use serde_json::Value;

use crate::errors::ServiceError;

/// Parses a stock quantity coming from a JSON payload.
///
/// Accepts JSON numbers and numeric strings. The result is finite and >= 0.
pub fn parse_stock_quantity(value: &Value, field: &str) -> Result<f64, ServiceError> {
    let quantity = match value {
        Value::Number(number) => number.as_f64().ok_or_else(|| {
            ServiceError::ValidationError(format!("{} is not a representable number", field))
        })?,
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(ServiceError::ValidationError(format!(
                    "{} must not be empty",
                    field
                )));
            }
            trimmed.parse::<f64>().map_err(|_| {
                ServiceError::ValidationError(format!("{} must be a number, got '{}'", field, raw))
            })?
        }
        Value::Null => {
            return Err(ServiceError::ValidationError(format!(
                "{} is required",
                field
            )))
        }
        _ => {
            return Err(ServiceError::ValidationError(format!(
                "{} must be a number",
                field
            )))
        }
    };

    check_stock_quantity(quantity, field)
}

/// Rejects NaN, infinities and negative quantities. Normalizes -0 to 0.
pub fn check_stock_quantity(quantity: f64, field: &str) -> Result<f64, ServiceError> {
    if !quantity.is_finite() {
        return Err(ServiceError::ValidationError(format!(
            "{} must be a finite number",
            field
        )));
    }
    if quantity < 0.0 {
        return Err(ServiceError::ValidationError(format!(
            "{} must be >= 0, got {}",
            field, quantity
        )));
    }
    Ok(if quantity == 0.0 { 0.0 } else { quantity })
}

/// Trims optional free text. Blank input becomes `None`.
pub fn normalize_text(
    value: Option<String>,
    field: &str,
    max_chars: usize,
) -> Result<Option<String>, ServiceError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > max_chars {
        return Err(ServiceError::ValidationError(format!(
            "{} must be at most {} characters",
            field, max_chars
        )));
    }
    Ok(Some(trimmed.to_string()))
}

/// Trims a required identity string such as an admin name.
pub fn require_text(value: &str, field: &str, max_chars: usize) -> Result<String, ServiceError> {
    normalize_text(Some(value.to_string()), field, max_chars)?
        .ok_or_else(|| ServiceError::ValidationError(format!("{} must not be empty", field)))
}
