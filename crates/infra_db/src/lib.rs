//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the credit ledger using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: repositories own the SQL and
//! row types, adapters implement the `domain_credit` ports on top of them and
//! translate rows into domain models.
//!
//! # Consistency
//!
//! Account rows carry a `version` column. Every account write runs in one
//! database transaction together with its ledger entry (and, for approvals,
//! the application status change) and is conditioned on the version that
//! was read. The `credit_transactions` table is append-only; a trigger
//! rejects updates and deletes.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresCreditLedger};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/credit_ledger")).await?;
//! run_migrations(&pool).await?;
//! let ledger = PostgresCreditLedger::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use error::{DatabaseError, TRANSACTION_NO_KEY};
pub use adapters::{PostgresAgentDirectory, PostgresAuditLog, PostgresCreditLedger};
