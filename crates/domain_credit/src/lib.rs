//! Credit Domain - Revolving Credit Lines for Travel Agents
//!
//! This crate implements the credit ledger that lets travel agents buy tour
//! bookings on account. It owns the balance invariants, the append-only
//! transaction history and the optimistic concurrency discipline that keeps
//! both consistent under concurrent request workers.
//!
//! # Components
//!
//! - [`CreditAccountEngine`]: debits, credits, limit changes and freezes
//! - [`ConcurrencyController`]: version-conditioned writes with a bounded retry budget
//! - [`ApplicationWorkflow`]: `PENDING -> APPROVED | REJECTED` limit requests
//! - [`AuditLogger`]: fire-and-forget recording of audited calls
//! - [`verify_ledger`]: replays an account's history against its stored state
//!
//! # Balance Model
//!
//! ```text
//! available = total_credit - used_credit
//! position  = available + deposit_balance   (the ledger's running balance)
//! ```
//!
//! `USED` entries move the position down, `REPAID` / `TOPUP` move it up and
//! `GRANTED` entries move it by the signed change of the limit.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_credit::{CreditAccountEngine, DebitCommand};
//!
//! let engine = CreditAccountEngine::new(ledger, directory, policy);
//! let receipt = engine.debit(DebitCommand::new(agent_id, Some(booking_id), dec!(300)), &ctx).await?;
//! assert_eq!(receipt.account.available_credit, dec!(700));
//! ```

pub mod account;
pub mod transaction;
pub mod application;
pub mod audit;
pub mod context;
pub mod conflict;
pub mod policy;
pub mod query;
pub mod ports;
pub mod concurrency;
pub mod engine;
pub mod workflow;
pub mod auditor;
pub mod verification;
pub mod memory;
pub mod error;

pub use account::{CreditAccount, CreditAccountView, CreditRating};
pub use transaction::{CreditTransaction, NewCreditTransaction, TransactionType};
pub use application::{
    ApplicationDecision, ApplicationStatus, CreditApplication, NewCreditApplication,
};
pub use audit::{AuditStatus, NewPaymentAuditLog, PaymentAuditLog};
pub use context::{CallerType, RequestContext};
pub use conflict::{ConcurrencyConflict, ConflictType};
pub use policy::{CreditPolicy, OverdraftPolicy};
pub use query::{ApplicationQuery, AuditQuery, DateRange, Page, PageRequest, TransactionQuery};
pub use ports::{
    AccountWrite, AgentDirectoryPort, AgentProfile, AuditLogPort, CommitOutcome,
    CreditLedgerPort, DecisionOutcome,
};
pub use concurrency::{Committed, ConcurrencyController};
pub use engine::{CreditAccountEngine, CreditCommand, CreditKind, DebitCommand, LedgerReceipt, PaymentCheck};
pub use workflow::{ApplicationOutcome, ApplicationWorkflow};
pub use auditor::AuditLogger;
pub use verification::{verify_ledger, LedgerIssue, LedgerVerification};
pub use error::CreditError;
