//! Decimal helpers for currency and quantities

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};

fn too_large(field: &str) -> EngineError {
    EngineError::validation(field, "is too large")
}

/// Round a currency amount to 2 decimal places (banker's rounding)
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}

/// `a * b`, failing on `field` instead of overflowing
pub fn checked_mul(field: &str, a: Decimal, b: Decimal) -> EngineResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| too_large(field))
}

/// `a + b`, failing on `field` instead of overflowing
pub fn checked_add(field: &str, a: Decimal, b: Decimal) -> EngineResult<Decimal> {
    a.checked_add(b).ok_or_else(|| too_large(field))
}

/// Sum of `values`, failing on `field` instead of overflowing
pub fn checked_sum(field: &str, values: impl IntoIterator<Item = Decimal>) -> EngineResult<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| checked_add(field, total, value))
}

/// `percent`% of `amount`, unrounded
pub fn percent_of(field: &str, amount: Decimal, percent: Decimal) -> EngineResult<Decimal> {
    Ok(checked_mul(field, amount, percent)? / Decimal::ONE_HUNDRED)
}

/// Whole number of times `divisor` fits in `value` (0 for a non-positive divisor)
pub fn whole_units(value: Decimal, divisor: Decimal) -> i64 {
    if divisor <= Decimal::ZERO || value <= Decimal::ZERO {
        return 0;
    }
    (value / divisor).floor().to_i64().unwrap_or(i64::MAX)
}
