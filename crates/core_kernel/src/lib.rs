//! Core Kernel - Foundational types shared by the credit ledger crates
//!
//! This crate provides the building blocks used across the workspace:
//! - Strongly typed identifiers for agents, bookings and applications
//! - Globally unique business numbers for transactions and applications
//! - Amount normalisation for monetary values
//! - Port abstractions implemented by storage adapters

pub mod amount;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use amount::{normalize_amount, require_positive, AMOUNT_SCALE};
pub use identifiers::{AgentId, BookingId, ApplicationId, AdminId, TransactionNo, ApplicationNo};
pub use error::CoreError;
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
