//! Error handling for the dairy cooperative ledger
//!
//! Every failure maps to a status code and a JSON `{ error: { code, message, field } }` body

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::EngineError;
use thiserror::Error;

/// SQLSTATE codes for serialization failure and deadlock
const RETRYABLE_SQLSTATES: [&str; 2] = ["40001", "40P01"];

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Amount paid {paid} exceeds amount due {due}")]
    Overpayment { paid: Decimal, due: Decimal },

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A row changed between read and write
    #[error("Concurrent update detected on {0}")]
    ConcurrencyConflict(String),

    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::ConcurrencyConflict(_))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(code) = db_err.code() {
                if RETRYABLE_SQLSTATES.contains(&code.as_ref()) {
                    return AppError::ConcurrencyConflict(format!("database ({})", code));
                }
            }
        }
        AppError::DatabaseError(err)
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation { field, message } => AppError::Validation { field, message },
            EngineError::InsufficientStock {
                product,
                requested,
                available,
            } => AppError::InsufficientStock {
                product,
                requested,
                available,
            },
            EngineError::UnknownProduct(id) => AppError::NotFound(format!("Product {}", id)),
            EngineError::Overpayment { paid, due } => AppError::Overpayment { paid, due },
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    fn new(code: &str, message: impl Into<String>, field: Option<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone(), Some(field.clone())),
            ),
            AppError::InsufficientStock { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("INSUFFICIENT_STOCK", self.to_string(), None),
            ),
            AppError::Overpayment { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("OVERPAYMENT", self.to_string(), Some("amount_paid".to_string())),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource), None),
            ),
            AppError::ConcurrencyConflict(_) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "CONCURRENCY_CONFLICT",
                    "The record was changed by another transaction. Please retry.",
                    None,
                ),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred", None),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone(), None),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred", None),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_keep_their_kind() {
        let err: AppError = EngineError::validation("fat_percent", "out of range").into();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "fat_percent"));

        let err: AppError = EngineError::Overpayment {
            paid: Decimal::from(10),
            due: Decimal::from(5),
        }
        .into();
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            AppError::validation("litres", "bad").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("Farmer".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::ConcurrencyConflict("product".into()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::DatabaseError(sqlx::Error::RowNotFound).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn plain_sqlx_errors_are_not_conflicts() {
        assert!(!AppError::from(sqlx::Error::PoolTimedOut).is_conflict());
    }
}
