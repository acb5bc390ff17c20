//! PostgreSQL Credit Ledger Adapter
//!
//! Implements `CreditLedgerPort` on top of [`CreditRepository`]. The
//! important piece is [`PostgresCreditLedger::commit`], which runs the
//! duplicate check, the optional application decision, the
//! version-conditioned account write and the ledger append in a single
//! database transaction. Any early return drops the transaction, which
//! rolls it back.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::PostgresCreditLedger;
//! use domain_credit::CreditLedgerPort;
//! use std::sync::Arc;
//!
//! let ledger: Arc<dyn CreditLedgerPort> = Arc::new(PostgresCreditLedger::new(pool));
//! let account = ledger.get_account(agent_id).await?;
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, AdminId, AgentId, ApplicationId, ApplicationNo, BookingId, DomainPort,
    HealthCheckResult, HealthCheckable, PortError, TransactionNo,
};
use domain_credit::{
    AccountWrite, AgentDirectoryPort, AgentProfile, ApplicationDecision, ApplicationQuery,
    ApplicationStatus, CommitOutcome, ConcurrencyConflict, CreditAccount, CreditApplication,
    CreditLedgerPort, CreditRating, CreditTransaction, DecisionOutcome, NewCreditApplication,
    NewCreditTransaction, Page, TransactionQuery, TransactionType,
};

use crate::error::{DatabaseError, TRANSACTION_NO_KEY};
use crate::repositories::credit::{
    AgentRow, ApplicationDecisionRow, ApplicationStatus as DbApplicationStatus, CreditAccountRow,
    CreditApplicationRow, CreditRepository, CreditTransactionRow, NewCreditApplicationRow,
    NewCreditTransactionRow, TransactionFilter, TransactionType as DbTransactionType,
};

/// PostgreSQL-backed implementation of `CreditLedgerPort`
#[derive(Debug, Clone)]
pub struct PostgresCreditLedger {
    repository: CreditRepository,
}

impl PostgresCreditLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: CreditRepository::new(pool),
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &CreditRepository {
        &self.repository
    }

    async fn version_conflict(&self, agent_id: AgentId, expected: Option<i64>) -> Result<CommitOutcome, PortError> {
        let current = self.get_account(agent_id).await?;
        Ok(CommitOutcome::VersionConflict(ConcurrencyConflict::version(
            agent_id,
            expected,
            current.as_ref(),
        )))
    }

    async fn duplicate(&self, transaction_no: &TransactionNo) -> Result<CommitOutcome, PortError> {
        let existing = self
            .repository
            .find_transaction(transaction_no.as_str())
            .await
            .map_err(PortError::from)?
            .ok_or_else(|| PortError::internal(format!("duplicate {} vanished", transaction_no)))?;
        Ok(CommitOutcome::DuplicateTransaction(row_to_transaction(existing)?))
    }
}

impl DomainPort for PostgresCreditLedger {}

#[async_trait]
impl HealthCheckable for PostgresCreditLedger {
    /// Performs a `SELECT 1` round trip on the pool
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();
        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(self.repository.pool())
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match result {
            Ok(_) => (AdapterHealth::Healthy, None),
            Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
        };
        HealthCheckResult {
            adapter_id: "postgres-credit-ledger".to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl CreditLedgerPort for PostgresCreditLedger {
    #[instrument(skip(self), fields(agent_id = %agent_id))]
    async fn get_account(&self, agent_id: AgentId) -> Result<Option<CreditAccount>, PortError> {
        let row = self.repository.get_account(agent_id.value()).await?;
        row.map(row_to_account).transpose()
    }

    async fn list_accounts(&self) -> Result<Vec<CreditAccount>, PortError> {
        self.repository
            .list_accounts()
            .await?
            .into_iter()
            .map(row_to_account)
            .collect()
    }

    async fn find_transaction(&self, transaction_no: &TransactionNo) -> Result<Option<CreditTransaction>, PortError> {
        let row = self.repository.find_transaction(transaction_no.as_str()).await?;
        row.map(row_to_transaction).transpose()
    }

    #[instrument(skip(self, write, decision), fields(agent_id = %write.account.agent_id, version = write.account.version))]
    async fn commit(
        &self,
        write: AccountWrite,
        decision: Option<ApplicationDecision>,
    ) -> Result<CommitOutcome, PortError> {
        let agent_id = write.account.agent_id;
        let mut tx = self.repository.pool().begin().await.map_err(DatabaseError::from)?;

        if let Some(entry) = &write.entry {
            if let Some(existing) =
                CreditRepository::find_transaction_in(&mut *tx, entry.transaction_no.as_str()).await?
            {
                return Ok(CommitOutcome::DuplicateTransaction(row_to_transaction(existing)?));
            }
        }

        let application = match &decision {
            Some(decision) => {
                let decided =
                    CreditRepository::decide_application_if_pending(&mut *tx, &decision_to_row(decision)).await?;
                match decided {
                    Some(row) => Some(row_to_application(row)?),
                    None => {
                        let current = CreditRepository::get_application_in(&mut *tx, decision.application_id.value())
                            .await?
                            .ok_or_else(|| PortError::not_found("CreditApplication", decision.application_id))?;
                        return Ok(CommitOutcome::ApplicationConflict(already_processed(&row_to_application(
                            current,
                        )?)));
                    }
                }
            }
            None => None,
        };

        let row = account_to_row(&write.account);
        let stored = match write.expected_version {
            Some(expected) => CreditRepository::update_account_if_version(&mut *tx, &row, expected).await?,
            None => CreditRepository::insert_account_if_absent(&mut *tx, &row).await?,
        };
        let Some(stored) = stored else {
            drop(tx);
            debug!("Conditional account write matched no row");
            return self.version_conflict(agent_id, write.expected_version).await;
        };

        let entry = match write.entry {
            Some(entry) => {
                let transaction_no = entry.transaction_no.clone();
                match CreditRepository::insert_transaction(&mut *tx, &transaction_to_row(entry)).await {
                    Ok(row) => Some(row_to_transaction(row)?),
                    Err(e) if e.is_duplicate_key(TRANSACTION_NO_KEY) => {
                        drop(tx);
                        return self.duplicate(&transaction_no).await;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            None => None,
        };

        tx.commit().await.map_err(DatabaseError::from)?;

        Ok(CommitOutcome::Committed {
            account: row_to_account(stored)?,
            entry,
            application,
        })
    }

    async fn list_transactions(&self, query: &TransactionQuery) -> Result<Page<CreditTransaction>, PortError> {
        let filter = TransactionFilter {
            agent_id: query.agent_id.value(),
            transaction_type: query.transaction_type.map(transaction_type_to_db),
            from: query.range.from,
            to: query.range.to,
            limit: query.page.limit() as i64,
            offset: query.page.offset() as i64,
        };
        let (rows, total) = self.repository.list_transactions(&filter).await?;
        let items = rows.into_iter().map(row_to_transaction).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, query.page, total.max(0) as u64))
    }

    async fn ledger_history(&self, agent_id: AgentId) -> Result<Vec<CreditTransaction>, PortError> {
        self.repository
            .ledger_history(agent_id.value())
            .await?
            .into_iter()
            .map(row_to_transaction)
            .collect()
    }

    async fn insert_application(&self, application: NewCreditApplication) -> Result<CreditApplication, PortError> {
        let row = NewCreditApplicationRow {
            application_no: application.application_no.as_str().to_string(),
            agent_id: application.agent_id.value(),
            requested_amount: application.requested_amount,
            reason: application.reason,
            submitted_at: application.submitted_at,
        };
        row_to_application(self.repository.insert_application(&row).await?)
    }

    async fn get_application(&self, id: ApplicationId) -> Result<Option<CreditApplication>, PortError> {
        let row = self.repository.get_application(id.value()).await?;
        row.map(row_to_application).transpose()
    }

    async fn decide_application(&self, decision: ApplicationDecision) -> Result<DecisionOutcome, PortError> {
        let mut tx = self.repository.pool().begin().await.map_err(DatabaseError::from)?;
        let decided = CreditRepository::decide_application_if_pending(&mut *tx, &decision_to_row(&decision)).await?;

        let outcome = match decided {
            Some(row) => DecisionOutcome::Decided(row_to_application(row)?),
            None => {
                let current = CreditRepository::get_application_in(&mut *tx, decision.application_id.value())
                    .await?
                    .ok_or_else(|| PortError::not_found("CreditApplication", decision.application_id))?;
                DecisionOutcome::AlreadyProcessed(already_processed(&row_to_application(current)?))
            }
        };
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(outcome)
    }

    async fn list_applications(&self, query: &ApplicationQuery) -> Result<Page<CreditApplication>, PortError> {
        let (rows, total) = self
            .repository
            .list_applications(
                query.agent_id.map(|id| id.value()),
                query.status.map(status_to_db),
                query.page.limit() as i64,
                query.page.offset() as i64,
            )
            .await?;
        let items = rows.into_iter().map(row_to_application).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, query.page, total.max(0) as u64))
    }
}

/// PostgreSQL-backed lookup into the agency's `agents` table
#[derive(Debug, Clone)]
pub struct PostgresAgentDirectory {
    repository: CreditRepository,
}

impl PostgresAgentDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: CreditRepository::new(pool),
        }
    }
}

impl DomainPort for PostgresAgentDirectory {}

#[async_trait]
impl AgentDirectoryPort for PostgresAgentDirectory {
    async fn find_agent(&self, agent_id: AgentId) -> Result<Option<AgentProfile>, PortError> {
        let row = self.repository.find_agent(agent_id.value()).await?;
        Ok(row.map(|AgentRow { agent_id, display_name, discount_rate, active }| AgentProfile {
            agent_id: AgentId::new(agent_id),
            display_name,
            discount_rate,
            active,
        }))
    }
}

// ============================================================================
// Conversion Functions
// ============================================================================

fn already_processed(application: &CreditApplication) -> ConcurrencyConflict {
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

fn row_to_account(row: CreditAccountRow) -> Result<CreditAccount, PortError> {
    let credit_rating = CreditRating::parse(row.credit_rating.trim()).ok_or_else(|| {
        PortError::from(DatabaseError::corrupt(format!(
            "credit_rating '{}' for agent {}",
            row.credit_rating, row.agent_id
        )))
    })?;

    Ok(CreditAccount {
        agent_id: AgentId::new(row.agent_id),
        total_credit: row.total_credit,
        used_credit: row.used_credit,
        deposit_balance: row.deposit_balance,
        credit_rating,
        interest_rate: row.interest_rate,
        billing_cycle_day: row.billing_cycle_day,
        last_settlement_date: row.last_settlement_date,
        overdraft_count: row.overdraft_count,
        is_frozen: row.is_frozen,
        version: row.version,
        last_modified_by: row.last_modified_by,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn account_to_row(account: &CreditAccount) -> CreditAccountRow {
    CreditAccountRow {
        agent_id: account.agent_id.value(),
        total_credit: account.total_credit,
        used_credit: account.used_credit,
        deposit_balance: account.deposit_balance,
        credit_rating: account.credit_rating.as_str().to_string(),
        interest_rate: account.interest_rate,
        billing_cycle_day: account.billing_cycle_day,
        last_settlement_date: account.last_settlement_date,
        overdraft_count: account.overdraft_count,
        is_frozen: account.is_frozen,
        version: account.version,
        last_modified_by: account.last_modified_by.clone(),
        created_at: account.created_at,
        updated_at: account.updated_at,
    }
}

fn row_to_transaction(row: CreditTransactionRow) -> Result<CreditTransaction, PortError> {
    let transaction_no = TransactionNo::parse(row.transaction_no)
        .map_err(|e| PortError::from(DatabaseError::corrupt(e.to_string())))?;

    Ok(CreditTransaction {
        id: row.id,
        transaction_no,
        agent_id: AgentId::new(row.agent_id),
        booking_id: row.booking_id.map(BookingId::new),
        transaction_type: transaction_type_from_db(row.transaction_type),
        amount: row.amount,
        balance_before: row.balance_before,
        balance_after: row.balance_after,
        description: row.description,
        created_by: row.created_by,
        created_at: row.created_at,
    })
}

fn transaction_to_row(entry: NewCreditTransaction) -> NewCreditTransactionRow {
    NewCreditTransactionRow {
        transaction_no: entry.transaction_no.into(),
        agent_id: entry.agent_id.value(),
        booking_id: entry.booking_id.map(|id| id.value()),
        transaction_type: transaction_type_to_db(entry.transaction_type),
        amount: entry.amount,
        balance_before: entry.balance_before,
        balance_after: entry.balance_after,
        description: entry.description,
        created_by: entry.created_by,
    }
}

fn row_to_application(row: CreditApplicationRow) -> Result<CreditApplication, PortError> {
    let application_no = ApplicationNo::parse(row.application_no)
        .map_err(|e| PortError::from(DatabaseError::corrupt(e.to_string())))?;

    Ok(CreditApplication {
        id: ApplicationId::new(row.id),
        application_no,
        agent_id: AgentId::new(row.agent_id),
        requested_amount: row.requested_amount,
        approved_amount: row.approved_amount,
        status: status_from_db(row.status),
        reason: row.reason,
        admin_comment: row.admin_comment,
        admin_id: row.admin_id.map(AdminId::new),
        submitted_at: row.submitted_at,
        processed_at: row.processed_at,
    })
}

fn decision_to_row(decision: &ApplicationDecision) -> ApplicationDecisionRow {
    ApplicationDecisionRow {
        id: decision.application_id.value(),
        status: status_to_db(decision.status),
        approved_amount: decision.approved_amount,
        admin_id: decision.admin_id.value(),
        admin_comment: decision.admin_comment.clone(),
        processed_at: decision.processed_at,
    }
}

fn transaction_type_to_db(value: TransactionType) -> DbTransactionType {
    match value {
        TransactionType::Granted => DbTransactionType::Granted,
        TransactionType::Used => DbTransactionType::Used,
        TransactionType::Repaid => DbTransactionType::Repaid,
        TransactionType::Topup => DbTransactionType::Topup,
    }
}

fn transaction_type_from_db(value: DbTransactionType) -> TransactionType {
    match value {
        DbTransactionType::Granted => TransactionType::Granted,
        DbTransactionType::Used => TransactionType::Used,
        DbTransactionType::Repaid => TransactionType::Repaid,
        DbTransactionType::Topup => TransactionType::Topup,
    }
}

fn status_to_db(value: ApplicationStatus) -> DbApplicationStatus {
    match value {
        ApplicationStatus::Pending => DbApplicationStatus::Pending,
        ApplicationStatus::Approved => DbApplicationStatus::Approved,
        ApplicationStatus::Rejected => DbApplicationStatus::Rejected,
    }
}

fn status_from_db(value: DbApplicationStatus) -> ApplicationStatus {
    match value {
        DbApplicationStatus::Pending => ApplicationStatus::Pending,
        DbApplicationStatus::Approved => ApplicationStatus::Approved,
        DbApplicationStatus::Rejected => ApplicationStatus::Rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_account_row_round_trip_preserves_state() {
        let mut account = CreditAccount::open(AgentId::new(12), dec!(2500), "ADM-1", Utc::now());
        account.credit_rating = CreditRating::A;
        account.used_credit = dec!(120.50);
        let back = row_to_account(account_to_row(&account)).unwrap();
        assert_eq!(back, account);
    }

    #[test]
    fn test_corrupt_rating_is_rejected() {
        let mut row = account_to_row(&CreditAccount::open(AgentId::new(1), dec!(1), "x", Utc::now()));
        row.credit_rating = "Z".to_string();
        assert!(row_to_account(row).is_err());
    }

    #[test]
    fn test_bpchar_padding_is_tolerated() {
        let mut row = account_to_row(&CreditAccount::open(AgentId::new(1), dec!(1), "x", Utc::now()));
        row.credit_rating = "C ".to_string();
        assert_eq!(row_to_account(row).unwrap().credit_rating, CreditRating::C);
    }
}
