//! Shared harness for domain_credit integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{
    AdminId, AgentId, ApplicationId, DomainPort, HealthCheckResult, HealthCheckable, PortError,
    TransactionNo,
};
use domain_credit::memory::{InMemoryAgentDirectory, InMemoryAuditLog, InMemoryCreditLedger};
use domain_credit::{
    AccountWrite, AgentProfile, ApplicationDecision, ApplicationQuery, ApplicationWorkflow,
    CommitOutcome, CreditAccountEngine, CreditApplication, CreditLedgerPort, CreditPolicy,
    CreditTransaction, DecisionOutcome, NewCreditApplication, Page, RequestContext,
    TransactionQuery,
};
use domain_credit::{CreditAccount, OverdraftPolicy};

pub struct Harness {
    pub ledger: Arc<InMemoryCreditLedger>,
    pub directory: Arc<InMemoryAgentDirectory>,
    pub audit: Arc<InMemoryAuditLog>,
    pub engine: Arc<CreditAccountEngine>,
    pub workflow: ApplicationWorkflow,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(CreditPolicy::default())
    }

    pub fn with_policy(policy: CreditPolicy) -> Self {
        let ledger = Arc::new(InMemoryCreditLedger::new());
        let directory = Arc::new(InMemoryAgentDirectory::new());
        let audit = Arc::new(InMemoryAuditLog::new());
        let engine = Arc::new(CreditAccountEngine::new(ledger.clone(), directory.clone(), policy));
        let workflow = ApplicationWorkflow::new(ledger.clone(), directory.clone(), engine.clone());
        Self {
            ledger,
            directory,
            audit,
            engine,
            workflow,
        }
    }

    pub async fn register_agent(&self, id: i64) -> AgentId {
        let agent_id = AgentId::new(id);
        self.directory
            .add_agent(AgentProfile {
                agent_id,
                display_name: format!("Agency {}", id),
                discount_rate: dec!(0.05),
                active: true,
            })
            .await;
        agent_id
    }

    /// Registers an agent and opens an account with `limit`
    pub async fn funded_agent(&self, id: i64, limit: Decimal) -> AgentId {
        let agent_id = self.register_agent(id).await;
        self.engine
            .open_account(agent_id, limit, &admin())
            .await
            .expect("open account");
        agent_id
    }
}

pub fn admin() -> RequestContext {
    RequestContext::admin(AdminId::new(1))
}

pub fn overdraft_policy(max: Decimal) -> CreditPolicy {
    CreditPolicy {
        overdraft: OverdraftPolicy {
            enabled: true,
            max_overdraft: max,
        },
        ..CreditPolicy::default()
    }
}

/// Ledger wrapper whose first `races` commits lose to a competing writer
///
/// Before delegating, it bumps the stored account by one version so the
/// caller's conditional write misses.
pub struct ContendedLedger {
    inner: Arc<InMemoryCreditLedger>,
    races: AtomicU32,
    pub commits: AtomicU32,
}

impl ContendedLedger {
    pub fn new(inner: Arc<InMemoryCreditLedger>, races: u32) -> Self {
        Self {
            inner,
            races: AtomicU32::new(races),
            commits: AtomicU32::new(0),
        }
    }

    async fn interfere(&self, agent_id: AgentId) -> Result<(), PortError> {
        if let Some(current) = self.inner.get_account(agent_id).await? {
            let mut next = current.clone();
            next.version += 1;
            next.last_modified_by = Some("competitor".to_string());
            next.updated_at = Utc::now();
            self.inner.commit(AccountWrite::update(&current, next, None), None).await?;
        }
        Ok(())
    }
}

impl DomainPort for ContendedLedger {}

#[async_trait]
impl HealthCheckable for ContendedLedger {
    async fn health_check(&self) -> HealthCheckResult {
        self.inner.health_check().await
    }
}

#[async_trait]
impl CreditLedgerPort for ContendedLedger {
    async fn get_account(&self, agent_id: AgentId) -> Result<Option<CreditAccount>, PortError> {
        self.inner.get_account(agent_id).await
    }

    async fn list_accounts(&self) -> Result<Vec<CreditAccount>, PortError> {
        self.inner.list_accounts().await
    }

    async fn find_transaction(&self, transaction_no: &TransactionNo) -> Result<Option<CreditTransaction>, PortError> {
        self.inner.find_transaction(transaction_no).await
    }

    async fn commit(
        &self,
        write: AccountWrite,
        decision: Option<ApplicationDecision>,
    ) -> Result<CommitOutcome, PortError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        let lose = self
            .races
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lose {
            self.interfere(write.account.agent_id).await?;
        }
        self.inner.commit(write, decision).await
    }

    async fn list_transactions(&self, query: &TransactionQuery) -> Result<Page<CreditTransaction>, PortError> {
        self.inner.list_transactions(query).await
    }

    async fn ledger_history(&self, agent_id: AgentId) -> Result<Vec<CreditTransaction>, PortError> {
        self.inner.ledger_history(agent_id).await
    }

    async fn insert_application(&self, application: NewCreditApplication) -> Result<CreditApplication, PortError> {
        self.inner.insert_application(application).await
    }

    async fn get_application(&self, id: ApplicationId) -> Result<Option<CreditApplication>, PortError> {
        self.inner.get_application(id).await
    }

    async fn decide_application(&self, decision: ApplicationDecision) -> Result<DecisionOutcome, PortError> {
        self.inner.decide_application(decision).await
    }

    async fn list_applications(&self, query: &ApplicationQuery) -> Result<Page<CreditApplication>, PortError> {
        self.inner.list_applications(query).await
    }
}
