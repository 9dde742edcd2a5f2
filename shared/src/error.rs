//! Errors raised by the pure engines

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Failure of a grading or pricing computation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Unknown product: {0}")]
    UnknownProduct(Uuid),

    #[error("Amount paid {paid} exceeds amount due {due}")]
    Overpayment { paid: Decimal, due: Decimal },
}

impl EngineError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
