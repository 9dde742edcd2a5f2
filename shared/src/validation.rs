//! Input validation shared by the engines and the ledger

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};

/// Validate that `value` lies within `[min, max]`
pub fn validate_range(field: &str, value: Decimal, min: Decimal, max: Decimal) -> EngineResult<()> {
    if value < min || value > max {
        return Err(EngineError::validation(
            field,
            format!("must be between {} and {}, got {}", min, max, value),
        ));
    }
    Ok(())
}

/// Validate that a quantity being committed is strictly positive
pub fn validate_positive(field: &str, value: Decimal) -> EngineResult<()> {
    if value <= Decimal::ZERO {
        return Err(EngineError::validation(field, "must be greater than zero"));
    }
    Ok(())
}

/// Validate that `value` carries at most `max_dp` decimal places
pub fn validate_scale(field: &str, value: Decimal, max_dp: u32) -> EngineResult<()> {
    if value.normalize().scale() > max_dp {
        return Err(EngineError::validation(
            field,
            format!("must have at most {} decimal places, got {}", max_dp, value),
        ));
    }
    Ok(())
}

pub fn validate_non_negative(field: &str, value: Decimal) -> EngineResult<()> {
    if value < Decimal::ZERO {
        return Err(EngineError::validation(field, "cannot be negative"));
    }
    Ok(())
}

/// Validate that free text (rejection reason, actor) is present
pub fn validate_required_text(field: &str, value: &str) -> EngineResult<()> {
    if value.trim().is_empty() {
        return Err(EngineError::validation(field, "is required"));
    }
    Ok(())
}

/// Trim optional free text, mapping blank input to `None`
pub fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
