//! Domain Adapters
//!
//! Implementations of the `domain_credit` ports backed by PostgreSQL.
//! Each adapter:
//! - Implements a domain port trait
//! - Translates between domain models and database row types
//! - Uses the repository layer for database operations
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::{PostgresAuditLog, PostgresCreditLedger};
//!
//! let ledger = PostgresCreditLedger::new(pool.clone());
//! let audit = PostgresAuditLog::new(pool);
//! ```

pub mod credit;
pub mod audit;

pub use credit::{PostgresAgentDirectory, PostgresCreditLedger};
pub use audit::PostgresAuditLog;
