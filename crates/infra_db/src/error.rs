//! Database error types
//!
//! PostgreSQL failures, with the SQLSTATE classes the credit schema raises
//! on purpose (unique keys, foreign keys to `agents`, amount checks) kept
//! apart from everything else.

use core_kernel::PortError;
use thiserror::Error;

/// Unique constraint guarding transaction-number idempotency
pub const TRANSACTION_NO_KEY: &str = "credit_transactions_transaction_no_key";

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// SQLSTATE 23505; `constraint` is the violated index when Postgres reports it
    #[error("Duplicate entry: {message}")]
    DuplicateEntry { constraint: Option<String>, message: String },

    /// SQLSTATE 23503, e.g. an account for an agent missing from `agents`
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// SQLSTATE 23514, one of the table CHECKs
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be mapped to its domain type
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl DatabaseError {
    /// ```rust
    /// use infra_db::DatabaseError;
    ///
    /// let error = DatabaseError::not_found("CreditAccount", "AGT-7");
    /// assert_eq!(error.to_string(), "CreditAccount not found: AGT-7");
    /// ```
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        DatabaseError::CorruptRow(message.into())
    }

    /// True for a unique violation on `constraint`
    pub fn is_duplicate_key(&self, constraint: &str) -> bool {
        matches!(
            self,
            DatabaseError::DuplicateEntry { constraint: Some(name), .. } if name == constraint
        )
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => DatabaseError::QueryFailed("no rows returned".to_string()),
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
                DatabaseError::ConnectionFailed(error.to_string())
            }
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.code().as_deref() {
                    Some("23505") => DatabaseError::DuplicateEntry {
                        constraint: db_err.constraint().map(str::to_string),
                        message,
                    },
                    Some("23503") => DatabaseError::ForeignKeyViolation(message),
                    Some("23514") => DatabaseError::ConstraintViolation(message),
                    _ => DatabaseError::QueryFailed(message),
                }
            }
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

impl From<DatabaseError> for PortError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound { entity, id } => PortError::not_found(entity, id),
            DatabaseError::DuplicateEntry { message, .. } => PortError::conflict(message),
            DatabaseError::ForeignKeyViolation(msg) | DatabaseError::ConstraintViolation(msg) => {
                PortError::rejected(msg)
            }
            DatabaseError::ConnectionFailed(msg) => PortError::unavailable(msg),
            DatabaseError::PoolExhausted => PortError::unavailable("connection pool exhausted"),
            other => PortError::internal(other.to_string()),
        }
    }
}
