//! In-process adapters
//!
//! Implement the credit ports over shared maps guarded by a single
//! `tokio::sync::RwLock`. `commit` holds the write lock for the whole
//! check-and-write sequence, so it offers the same atomicity as a database
//! transaction. Used by tests and by embedders that do not need durability.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use core_kernel::{
    AgentId, ApplicationId, DomainPort, HealthCheckResult, HealthCheckable, PortError, TransactionNo,
};

use crate::account::CreditAccount;
use crate::application::{ApplicationDecision, CreditApplication, NewCreditApplication};
use crate::audit::{NewPaymentAuditLog, PaymentAuditLog};
use crate::conflict::ConcurrencyConflict;
use crate::ports::{
    AccountWrite, AgentDirectoryPort, AgentProfile, AuditLogPort, CommitOutcome, CreditLedgerPort,
    DecisionOutcome,
};
use crate::query::{ApplicationQuery, AuditQuery, Page, TransactionQuery};
use crate::transaction::CreditTransaction;

#[derive(Default)]
struct LedgerState {
    accounts: BTreeMap<AgentId, CreditAccount>,
    transactions: Vec<CreditTransaction>,
    by_number: HashMap<TransactionNo, usize>,
    applications: BTreeMap<ApplicationId, CreditApplication>,
    next_application_id: i64,
}

impl LedgerState {
    fn pending_conflict(application: &CreditApplication) -> ConcurrencyConflict {
        ConcurrencyConflict::concurrent_edit(
            &application.application_no,
            format!(
                "application {} was already processed ({})",
                application.application_no,
                application.status.as_str()
            ),
            application.admin_id.map(|id| id.to_string()),
            application.processed_at,
        )
    }
}

/// Credit ledger held in memory
#[derive(Default)]
pub struct InMemoryCreditLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryCreditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ledger entries across all accounts
    pub async fn transaction_count(&self) -> usize {
        self.state.read().await.transactions.len()
    }
}

impl DomainPort for InMemoryCreditLedger {}

#[async_trait]
impl HealthCheckable for InMemoryCreditLedger {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("credit_ledger_memory")
    }
}

#[async_trait]
impl CreditLedgerPort for InMemoryCreditLedger {
    async fn get_account(&self, agent_id: AgentId) -> Result<Option<CreditAccount>, PortError> {
        Ok(self.state.read().await.accounts.get(&agent_id).cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<CreditAccount>, PortError> {
        Ok(self.state.read().await.accounts.values().cloned().collect())
    }

    async fn find_transaction(&self, transaction_no: &TransactionNo) -> Result<Option<CreditTransaction>, PortError> {
        let state = self.state.read().await;
        Ok(state
            .by_number
            .get(transaction_no)
            .map(|&idx| state.transactions[idx].clone()))
    }

    async fn commit(
        &self,
        write: AccountWrite,
        decision: Option<ApplicationDecision>,
    ) -> Result<CommitOutcome, PortError> {
        let mut state = self.state.write().await;
        let agent_id = write.account.agent_id;

        if let Some(entry) = &write.entry {
            if let Some(&idx) = state.by_number.get(&entry.transaction_no) {
                return Ok(CommitOutcome::DuplicateTransaction(state.transactions[idx].clone()));
            }
        }

        if let Some(decision) = &decision {
            match state.applications.get(&decision.application_id) {
                Some(app) if app.status.is_terminal() => {
                    return Ok(CommitOutcome::ApplicationConflict(LedgerState::pending_conflict(app)));
                }
                Some(_) => {}
                None => return Err(PortError::not_found("CreditApplication", decision.application_id)),
            }
        }

        let current = state.accounts.get(&agent_id);
        let version_matches = match (write.expected_version, current) {
            (None, None) => true,
            (Some(expected), Some(current)) => current.version == expected,
            _ => false,
        };
        if !version_matches {
            return Ok(CommitOutcome::VersionConflict(ConcurrencyConflict::version(
                agent_id,
                write.expected_version,
                current,
            )));
        }

        let application = match &decision {
            Some(decision) => state.applications.get_mut(&decision.application_id).map(|app| {
                app.apply(decision);
                app.clone()
            }),
            None => None,
        };

        state.accounts.insert(agent_id, write.account.clone());

        let entry = write.entry.map(|entry| {
            let idx = state.transactions.len();
            let stored = entry.into_transaction(idx as i64 + 1, Utc::now());
            state.by_number.insert(stored.transaction_no.clone(), idx);
            state.transactions.push(stored.clone());
            stored
        });

        Ok(CommitOutcome::Committed {
            account: write.account,
            entry,
            application,
        })
    }

    async fn list_transactions(&self, query: &TransactionQuery) -> Result<Page<CreditTransaction>, PortError> {
        let state = self.state.read().await;
        let matching: Vec<_> = state
            .transactions
            .iter()
            .rev()
            .filter(|t| t.agent_id == query.agent_id)
            .filter(|t| query.transaction_type.map_or(true, |ty| t.transaction_type == ty))
            .filter(|t| query.range.contains(t.created_at))
            .cloned()
            .collect();
        Ok(Page::from_all(matching, query.page))
    }

    async fn ledger_history(&self, agent_id: AgentId) -> Result<Vec<CreditTransaction>, PortError> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .filter(|t| t.agent_id == agent_id)
            .cloned()
            .collect())
    }

    async fn insert_application(&self, application: NewCreditApplication) -> Result<CreditApplication, PortError> {
        let mut state = self.state.write().await;
        state.next_application_id += 1;
        let stored = application.into_application(ApplicationId::new(state.next_application_id));
        state.applications.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_application(&self, id: ApplicationId) -> Result<Option<CreditApplication>, PortError> {
        Ok(self.state.read().await.applications.get(&id).cloned())
    }

    async fn decide_application(&self, decision: ApplicationDecision) -> Result<DecisionOutcome, PortError> {
        let mut state = self.state.write().await;
        let app = state
            .applications
            .get_mut(&decision.application_id)
            .ok_or_else(|| PortError::not_found("CreditApplication", decision.application_id))?;

        if app.status.is_terminal() {
            return Ok(DecisionOutcome::AlreadyProcessed(LedgerState::pending_conflict(app)));
        }
        app.apply(&decision);
        Ok(DecisionOutcome::Decided(app.clone()))
    }

    async fn list_applications(&self, query: &ApplicationQuery) -> Result<Page<CreditApplication>, PortError> {
        let state = self.state.read().await;
        let matching: Vec<_> = state
            .applications
            .values()
            .rev()
            .filter(|a| query.agent_id.map_or(true, |id| a.agent_id == id))
            .filter(|a| query.status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        Ok(Page::from_all(matching, query.page))
    }
}

/// Audit store held in memory
#[derive(Default)]
pub struct InMemoryAuditLog {
    records: RwLock<Vec<PaymentAuditLog>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<PaymentAuditLog> {
        self.records.read().await.clone()
    }
}

impl DomainPort for InMemoryAuditLog {}

#[async_trait]
impl AuditLogPort for InMemoryAuditLog {
    async fn insert_audit_log(&self, record: NewPaymentAuditLog) -> Result<PaymentAuditLog, PortError> {
        let mut records = self.records.write().await;
        let stored = record.into_log(records.len() as i64 + 1);
        records.push(stored.clone());
        Ok(stored)
    }

    async fn list_audit_logs(&self, query: &AuditQuery) -> Result<Page<PaymentAuditLog>, PortError> {
        let records = self.records.read().await;
        let matching: Vec<_> = records
            .iter()
            .rev()
            .filter(|r| query.agent_id.map_or(true, |id| r.agent_id == Some(id)))
            .filter(|r| query.operation.as_deref().map_or(true, |op| r.operation == op))
            .filter(|r| query.range.contains(r.created_at))
            .cloned()
            .collect();
        Ok(Page::from_all(matching, query.page))
    }
}

/// Agent directory held in memory
#[derive(Default)]
pub struct InMemoryAgentDirectory {
    agents: RwLock<HashMap<AgentId, AgentProfile>>,
}

impl InMemoryAgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_agent(&self, profile: AgentProfile) {
        self.agents.write().await.insert(profile.agent_id, profile);
    }
}

impl DomainPort for InMemoryAgentDirectory {}

#[async_trait]
impl AgentDirectoryPort for InMemoryAgentDirectory {
    async fn find_agent(&self, agent_id: AgentId) -> Result<Option<AgentProfile>, PortError> {
        Ok(self.agents.read().await.get(&agent_id).cloned())
    }
}
