//! Credit Domain Ports
//!
//! Storage and collaborator interfaces required by the credit core. The
//! PostgreSQL adapters live in `infra_db`; [`crate::memory`] provides an
//! in-process implementation with the same guarantees.
//!
//! # Commit contract
//!
//! [`CreditLedgerPort::commit`] is the compare-and-swap primitive. An
//! implementation must perform the following as one atomic unit and leave
//! no trace of a rejected write:
//!
//! 1. If the write carries a ledger entry whose `transaction_no` already
//!    exists, return [`CommitOutcome::DuplicateTransaction`] with the
//!    stored entry.
//! 2. If an application decision is attached, move the application out of
//!    `PENDING`; if it is no longer pending, return
//!    [`CommitOutcome::ApplicationConflict`].
//! 3. Write the account: insert when `expected_version` is `None`, else
//!    update only where the stored version equals `expected_version`. When
//!    nothing matches, return [`CommitOutcome::VersionConflict`] built from
//!    the current row.
//! 4. Append the ledger entry.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{AgentId, ApplicationId, DomainPort, HealthCheckable, PortError, TransactionNo};

use crate::account::CreditAccount;
use crate::application::{ApplicationDecision, CreditApplication, NewCreditApplication};
use crate::audit::{NewPaymentAuditLog, PaymentAuditLog};
use crate::conflict::ConcurrencyConflict;
use crate::query::{ApplicationQuery, AuditQuery, Page, TransactionQuery};
use crate::transaction::{CreditTransaction, NewCreditTransaction};

/// A planned account write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountWrite {
    /// Full next state of the account, version already incremented
    pub account: CreditAccount,
    /// Version the plan was based on; `None` creates the account
    pub expected_version: Option<i64>,
    /// Ledger entry appended in the same transaction
    pub entry: Option<NewCreditTransaction>,
}

impl AccountWrite {
    pub fn update(current: &CreditAccount, next: CreditAccount, entry: Option<NewCreditTransaction>) -> Self {
        Self {
            account: next,
            expected_version: Some(current.version),
            entry,
        }
    }

    pub fn create(account: CreditAccount, entry: Option<NewCreditTransaction>) -> Self {
        Self {
            account,
            expected_version: None,
            entry,
        }
    }
}

/// Result of [`CreditLedgerPort::commit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed {
        account: CreditAccount,
        entry: Option<CreditTransaction>,
        application: Option<CreditApplication>,
    },
    /// The account changed (or appeared) since it was read
    VersionConflict(ConcurrencyConflict),
    /// The attached application was already decided
    ApplicationConflict(ConcurrencyConflict),
    /// The transaction number was already used; nothing was written
    DuplicateTransaction(CreditTransaction),
}

/// Result of [`CreditLedgerPort::decide_application`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionOutcome {
    Decided(CreditApplication),
    AlreadyProcessed(ConcurrencyConflict),
}

/// Durable account state, transaction log and applications
#[async_trait]
pub trait CreditLedgerPort: DomainPort + HealthCheckable {
    async fn get_account(&self, agent_id: AgentId) -> Result<Option<CreditAccount>, PortError>;

    /// All accounts ordered by agent id
    async fn list_accounts(&self) -> Result<Vec<CreditAccount>, PortError>;

    async fn find_transaction(&self, transaction_no: &TransactionNo) -> Result<Option<CreditTransaction>, PortError>;

    /// Atomic conditional write; see the module documentation
    async fn commit(
        &self,
        write: AccountWrite,
        decision: Option<ApplicationDecision>,
    ) -> Result<CommitOutcome, PortError>;

    async fn list_transactions(&self, query: &TransactionQuery) -> Result<Page<CreditTransaction>, PortError>;

    /// Full history of an account in insertion order
    async fn ledger_history(&self, agent_id: AgentId) -> Result<Vec<CreditTransaction>, PortError>;

    async fn insert_application(&self, application: NewCreditApplication) -> Result<CreditApplication, PortError>;

    async fn get_application(&self, id: ApplicationId) -> Result<Option<CreditApplication>, PortError>;

    /// Moves a pending application to a terminal state without touching the account
    async fn decide_application(&self, decision: ApplicationDecision) -> Result<DecisionOutcome, PortError>;

    async fn list_applications(&self, query: &ApplicationQuery) -> Result<Page<CreditApplication>, PortError>;
}

/// Append-only store for audit records
#[async_trait]
pub trait AuditLogPort: DomainPort {
    async fn insert_audit_log(&self, record: NewPaymentAuditLog) -> Result<PaymentAuditLog, PortError>;

    async fn list_audit_logs(&self, query: &AuditQuery) -> Result<Page<PaymentAuditLog>, PortError>;
}

/// Agent as known to the surrounding agency system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent_id: AgentId,
    pub display_name: String,
    pub discount_rate: Decimal,
    pub active: bool,
}

/// Read-only lookup into the agency's agent directory
#[async_trait]
pub trait AgentDirectoryPort: DomainPort {
    async fn find_agent(&self, agent_id: AgentId) -> Result<Option<AgentProfile>, PortError>;
}
