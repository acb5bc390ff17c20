//! Concurrency conflict results
//!
//! A conflict is a transient value handed back to the caller; it is never
//! persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::account::CreditAccount;

/// Class of conflict detected on a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictType {
    /// No conflict
    None,
    /// The version-conditioned write affected zero rows
    Version,
    /// A record without a version column was already resolved by someone else
    ConcurrentEdit,
}

/// Detail of a detected conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyConflict {
    pub conflict_type: ConflictType,
    /// Identifier of the contested record
    pub record_id: Option<String>,
    /// Version the writer based its change on
    pub expected_version: Option<i64>,
    /// Version found in the store when the write was rejected
    pub current_version: Option<i64>,
    pub last_modified_by: Option<String>,
    pub last_modified_at: Option<DateTime<Utc>>,
    pub message: String,
}

impl ConcurrencyConflict {
    pub fn none() -> Self {
        Self {
            conflict_type: ConflictType::None,
            record_id: None,
            expected_version: None,
            current_version: None,
            last_modified_by: None,
            last_modified_at: None,
            message: String::new(),
        }
    }

    /// Builds a `VERSION` conflict from the row that won the race
    ///
    /// `expected` is `None` when the writer tried to create the account;
    /// `current` is `None` when the row has disappeared.
    pub fn version(record_id: impl fmt::Display, expected: Option<i64>, current: Option<&CreditAccount>) -> Self {
        let record_id = record_id.to_string();
        let message = match (expected, current) {
            (Some(expected), Some(current)) => format!(
                "{} was modified concurrently: expected version {}, found {}",
                record_id, expected, current.version
            ),
            (None, Some(current)) => format!(
                "{} was created concurrently at version {}",
                record_id, current.version
            ),
            (_, None) => format!("{} no longer exists", record_id),
        };

        Self {
            conflict_type: ConflictType::Version,
            record_id: Some(record_id),
            expected_version: expected,
            current_version: current.map(|a| a.version),
            last_modified_by: current.and_then(|a| a.last_modified_by.clone()),
            last_modified_at: current.map(|a| a.updated_at),
            message,
        }
    }

    /// Builds a `CONCURRENT_EDIT` conflict
    pub fn concurrent_edit(
        record_id: impl fmt::Display,
        message: impl Into<String>,
        modified_by: Option<String>,
        modified_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            conflict_type: ConflictType::ConcurrentEdit,
            record_id: Some(record_id.to_string()),
            expected_version: None,
            current_version: None,
            last_modified_by: modified_by,
            last_modified_at: modified_at,
            message: message.into(),
        }
    }

    pub fn has_conflict(&self) -> bool {
        self.conflict_type != ConflictType::None
    }
}

impl fmt::Display for ConcurrencyConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.conflict_type {
            ConflictType::None => write!(f, "no conflict"),
            ConflictType::Version => write!(f, "[VERSION] {}", self.message),
            ConflictType::ConcurrentEdit => write!(f, "[CONCURRENT_EDIT] {}", self.message),
        }
    }
}
