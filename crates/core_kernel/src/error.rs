//! Input errors raised by the kernel's value types

use rust_decimal::Decimal;
use thiserror::Error;

/// Rejected input at the edge of the ledger
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Amounts must be strictly positive after rounding to cents
    #[error("Validation error: {field} must be greater than zero, got {value}")]
    NonPositiveAmount { field: String, value: Decimal },

    /// An identifier or business number failed to parse
    #[error("Validation error: malformed {kind} '{value}'")]
    MalformedIdentifier { kind: &'static str, value: String },
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn malformed(kind: &'static str, value: impl Into<String>) -> Self {
        CoreError::MalformedIdentifier {
            kind,
            value: value.into(),
        }
    }
}
