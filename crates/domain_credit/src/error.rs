//! Credit domain errors
//!
//! Everything except `Persistence` is an expected business outcome that the
//! caller can act on (top up, contact an administrator, retry later).

use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::{AgentId, CoreError, PortError};

use crate::conflict::ConcurrencyConflict;

/// Errors that can occur in the credit domain
#[derive(Debug, Error)]
pub enum CreditError {
    /// Non-positive amount, malformed identifier, or an already-terminal application
    #[error("Validation error: {0}")]
    Validation(String),

    /// No account or application exists for the given id
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    /// Debits are blocked while the account is frozen
    #[error("Credit account for {0} is frozen")]
    FrozenAccount(AgentId),

    /// Available credit does not cover the requested amount
    #[error("Insufficient credit: requested {requested}, available {available}, short by {shortfall}")]
    InsufficientCredit {
        requested: Decimal,
        available: Decimal,
        shortfall: Decimal,
    },

    /// Another writer won the race for the same record
    #[error("Concurrent modification: {0}")]
    ConcurrentEdit(ConcurrencyConflict),

    /// The caller's role does not permit the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Storage unavailable or an unclassified constraint violation
    #[error("Persistence error: {0}")]
    Persistence(#[source] PortError),
}

impl CreditError {
    pub fn validation(message: impl Into<String>) -> Self {
        CreditError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        CreditError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        CreditError::Forbidden(message.into())
    }

    /// Returns true for outcomes the immediate caller is expected to handle
    pub fn is_expected(&self) -> bool {
        !matches!(self, CreditError::Persistence(_))
    }

    /// Returns the shortfall carried by an `InsufficientCredit` error
    pub fn shortfall(&self) -> Option<Decimal> {
        match self {
            CreditError::InsufficientCredit { shortfall, .. } => Some(*shortfall),
            _ => None,
        }
    }

    /// Returns the conflict detail carried by a `ConcurrentEdit` error
    pub fn conflict(&self) -> Option<&ConcurrencyConflict> {
        match self {
            CreditError::ConcurrentEdit(conflict) => Some(conflict),
            _ => None,
        }
    }
}

impl From<CoreError> for CreditError {
    fn from(error: CoreError) -> Self {
        let message = match error {
            CoreError::Validation(message) => message,
            CoreError::NonPositiveAmount { field, value } => {
                format!("{} must be greater than zero, got {}", field, value)
            }
            CoreError::MalformedIdentifier { kind, value } => format!("malformed {} '{}'", kind, value),
        };
        CreditError::Validation(message)
    }
}

impl From<PortError> for CreditError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity, id } => CreditError::NotFound { entity, id },
            PortError::Rejected(message) => CreditError::Validation(message),
            other => CreditError::Persistence(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insufficient_credit_message_carries_shortfall() {
        let error = CreditError::InsufficientCredit {
            requested: dec!(800),
            available: dec!(700),
            shortfall: dec!(100),
        };
        assert!(error.to_string().contains("short by 100"));
        assert_eq!(error.shortfall(), Some(dec!(100)));
        assert!(error.is_expected());
    }

    #[test]
    fn test_port_errors_map_to_taxonomy() {
        let not_found: CreditError = PortError::not_found("CreditAccount", "AGT-1").into();
        assert!(matches!(not_found, CreditError::NotFound { entity: "CreditAccount", .. }));

        let down: CreditError = PortError::unavailable("refused").into();
        assert!(matches!(down, CreditError::Persistence(_)));
        assert!(!down.is_expected());
    }
}
