//! Repository implementations
//!
//! Repositories encapsulate SQL and map database rows; they know nothing
//! about the domain types. Adapters translate between the two.
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate compiles
//! without a live database.

pub mod credit;
pub mod audit;

pub use credit::CreditRepository;
pub use audit::AuditRepository;
