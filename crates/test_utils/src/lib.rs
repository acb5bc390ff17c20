//! Shared helpers for the credit ledger test suites
//!
//! Fixtures and builders produce agents, caller contexts and account
//! snapshots; `generators` drives proptest over ledger operation sequences;
//! `assertions` checks balance invariants; `database` starts a migrated
//! Postgres for the `db_test!` integration tests.

pub mod assertions;
pub mod builders;
pub mod database;
pub mod fixtures;
pub mod generators;

pub use assertions::*;
pub use builders::*;
pub use database::*;
pub use fixtures::*;
pub use generators::*;
