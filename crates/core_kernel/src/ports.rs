//! Storage port plumbing shared by the ledger's adapters
//!
//! The port traits themselves live in `domain_credit`; this module holds the
//! error type every adapter reports through and the health probe the service
//! exposes. Postgres (`infra_db`) and in-memory (`domain_credit::memory`)
//! adapters both implement against these.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure reported by a storage adapter
#[derive(Debug, Error)]
pub enum PortError {
    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: String },

    /// The store refused the write because it breaks a schema rule
    #[error("Validation error: {0}")]
    Rejected(String),

    /// A uniqueness rule rejected the write
    #[error("write conflict: {0}")]
    Conflict(String),

    /// The store could not be reached, or had no connection to hand out
    #[error("store unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("store failure: {0}")]
    Internal(String),
}

impl PortError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        PortError::NotFound { entity, id: id.to_string() }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        PortError::Rejected(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        PortError::Unavailable { message: message.into(), source: None }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal(message.into())
    }

    /// Whether repeating the call later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Unavailable { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

/// Marker for ledger ports; adapters are shared across tasks behind `Arc`
pub trait DomainPort: Send + Sync + 'static {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    /// Reachable but slow to answer
    Degraded,
    Unhealthy,
}

/// Outcome of probing one adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub adapter_id: String,
    pub status: AdapterHealth,
    pub latency_ms: u64,
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthCheckResult {
    /// In-process adapters answer instantly
    pub fn healthy(adapter_id: impl Into<String>) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: None,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_entity_and_id() {
        let error = PortError::not_found("CreditAccount", "AGT-1");
        assert!(error.is_not_found());
        assert!(!error.is_transient());
        assert_eq!(error.to_string(), "CreditAccount AGT-1 does not exist");
    }

    #[test]
    fn test_only_unavailable_is_transient() {
        assert!(PortError::unavailable("refused").is_transient());
        assert!(!PortError::rejected("amount must be positive").is_transient());
        assert!(!PortError::conflict("transaction_no taken").is_transient());
        assert!(!PortError::internal("bad row").is_transient());
    }

    #[test]
    fn test_health_result_serializes_status_in_snake_case() {
        let result = HealthCheckResult::healthy("credit_ledger_memory");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "healthy");
        assert!(result.message.is_none());
    }
}
