//! Service error handling

use serde::Serialize;
use thiserror::Error;

use domain_credit::CreditError;
use infra_db::DatabaseError;

/// Service error types
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A request DTO failed its validation rules
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Credit(#[from] CreditError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Error body handed to the request layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ServiceError {
    /// Stable machine-readable code for the failure
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidRequest(_) => "validation_error",
            ServiceError::Credit(err) => match err {
                CreditError::Validation(_) => "validation_error",
                CreditError::NotFound { .. } => "not_found",
                CreditError::FrozenAccount(_) => "account_frozen",
                CreditError::InsufficientCredit { .. } => "insufficient_credit",
                CreditError::ConcurrentEdit(_) => "concurrent_edit",
                CreditError::Forbidden(_) => "forbidden",
                CreditError::Persistence(_) => "persistence_error",
            },
            ServiceError::Config(_) => "configuration_error",
            ServiceError::Database(_) => "database_error",
        }
    }

    /// Whether the caller can act on the failure without operator help
    pub fn is_expected(&self) -> bool {
        match self {
            ServiceError::InvalidRequest(_) => true,
            ServiceError::Credit(err) => err.is_expected(),
            _ => false,
        }
    }

    /// Structured response with remediation details where available
    pub fn to_response(&self) -> ErrorResponse {
        let details = match self {
            ServiceError::InvalidRequest(errors) => Some(
                errors
                    .field_errors()
                    .iter()
                    .map(|(field, errs)| format!("{}: {} rule(s) failed", field, errs.len()))
                    .collect(),
            ),
            ServiceError::Credit(CreditError::InsufficientCredit {
                requested,
                available,
                shortfall,
            }) => Some(vec![
                format!("requested={}", requested),
                format!("available={}", available),
                format!("shortfall={}", shortfall),
            ]),
            ServiceError::Credit(CreditError::ConcurrentEdit(conflict)) => conflict
                .last_modified_by
                .as_ref()
                .map(|by| vec![format!("last_modified_by={}", by)]),
            _ => None,
        };

        ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
            details,
        }
    }
}
