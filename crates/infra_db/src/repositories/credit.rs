//! Credit ledger repository
//!
//! SQL for accounts, ledger entries and limit applications. Read methods
//! run on the pool; the conditional writes take a connection so the adapter
//! can compose them inside one transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};

use crate::error::DatabaseError;

/// Repository for credit accounts, transactions and applications
///
/// # Example
///
/// ```rust,ignore
/// use infra_db::repositories::CreditRepository;
///
/// let repo = CreditRepository::new(pool);
/// let account = repo.get_account(42).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CreditRepository {
    pool: PgPool,
}

impl CreditRepository {
    /// Creates a new CreditRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ---------------------------------------------------------------------
    // Accounts
    // ---------------------------------------------------------------------

    pub async fn get_account(&self, agent_id: i64) -> Result<Option<CreditAccountRow>, DatabaseError> {
        let row = sqlx::query_as::<_, CreditAccountRow>("SELECT * FROM credit_accounts WHERE agent_id = $1")
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn list_accounts(&self) -> Result<Vec<CreditAccountRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, CreditAccountRow>("SELECT * FROM credit_accounts ORDER BY agent_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Writes the next account state only if the stored version still matches
    ///
    /// Returns `None` when another writer got there first.
    pub async fn update_account_if_version(
        conn: &mut PgConnection,
        account: &CreditAccountRow,
        expected_version: i64,
    ) -> Result<Option<CreditAccountRow>, DatabaseError> {
        let row = sqlx::query_as::<_, CreditAccountRow>(
            r#"
            UPDATE credit_accounts SET
                total_credit = $2,
                used_credit = $3,
                deposit_balance = $4,
                credit_rating = $5,
                interest_rate = $6,
                billing_cycle_day = $7,
                last_settlement_date = $8,
                overdraft_count = $9,
                is_frozen = $10,
                version = $11,
                last_modified_by = $12,
                updated_at = $13
            WHERE agent_id = $1 AND version = $14
            RETURNING *
            "#,
        )
        .bind(account.agent_id)
        .bind(account.total_credit)
        .bind(account.used_credit)
        .bind(account.deposit_balance)
        .bind(&account.credit_rating)
        .bind(account.interest_rate)
        .bind(account.billing_cycle_day)
        .bind(account.last_settlement_date)
        .bind(account.overdraft_count)
        .bind(account.is_frozen)
        .bind(account.version)
        .bind(&account.last_modified_by)
        .bind(account.updated_at)
        .bind(expected_version)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row)
    }

    /// Inserts a new account; returns `None` when one already exists
    pub async fn insert_account_if_absent(
        conn: &mut PgConnection,
        account: &CreditAccountRow,
    ) -> Result<Option<CreditAccountRow>, DatabaseError> {
        let row = sqlx::query_as::<_, CreditAccountRow>(
            r#"
            INSERT INTO credit_accounts (
                agent_id, total_credit, used_credit, deposit_balance, credit_rating,
                interest_rate, billing_cycle_day, last_settlement_date, overdraft_count,
                is_frozen, version, last_modified_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (agent_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(account.agent_id)
        .bind(account.total_credit)
        .bind(account.used_credit)
        .bind(account.deposit_balance)
        .bind(&account.credit_rating)
        .bind(account.interest_rate)
        .bind(account.billing_cycle_day)
        .bind(account.last_settlement_date)
        .bind(account.overdraft_count)
        .bind(account.is_frozen)
        .bind(account.version)
        .bind(&account.last_modified_by)
        .bind(account.created_at)
        .bind(account.updated_at)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row)
    }

    // ---------------------------------------------------------------------
    // Ledger entries
    // ---------------------------------------------------------------------

    pub async fn find_transaction(&self, transaction_no: &str) -> Result<Option<CreditTransactionRow>, DatabaseError> {
        let row = sqlx::query_as::<_, CreditTransactionRow>(
            "SELECT * FROM credit_transactions WHERE transaction_no = $1",
        )
        .bind(transaction_no)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Same lookup inside an open transaction
    pub async fn find_transaction_in(
        conn: &mut PgConnection,
        transaction_no: &str,
    ) -> Result<Option<CreditTransactionRow>, DatabaseError> {
        let row = sqlx::query_as::<_, CreditTransactionRow>(
            "SELECT * FROM credit_transactions WHERE transaction_no = $1",
        )
        .bind(transaction_no)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row)
    }

    /// Appends a ledger entry
    ///
    /// # Errors
    ///
    /// `DatabaseError::DuplicateEntry` when the transaction number exists.
    pub async fn insert_transaction(
        conn: &mut PgConnection,
        entry: &NewCreditTransactionRow,
    ) -> Result<CreditTransactionRow, DatabaseError> {
        let row = sqlx::query_as::<_, CreditTransactionRow>(
            r#"
            INSERT INTO credit_transactions (
                transaction_no, agent_id, booking_id, transaction_type, amount,
                balance_before, balance_after, description, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&entry.transaction_no)
        .bind(entry.agent_id)
        .bind(entry.booking_id)
        .bind(entry.transaction_type)
        .bind(entry.amount)
        .bind(entry.balance_before)
        .bind(entry.balance_after)
        .bind(&entry.description)
        .bind(&entry.created_by)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    /// One page of an agent's entries, newest first, with the total match count
    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<(Vec<CreditTransactionRow>, i64), DatabaseError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM credit_transactions
            WHERE agent_id = $1
              AND ($2::credit_transaction_type IS NULL OR transaction_type = $2)
              AND ($3::timestamptz IS NULL OR created_at >= $3)
              AND ($4::timestamptz IS NULL OR created_at < $4)
            "#,
        )
        .bind(filter.agent_id)
        .bind(filter.transaction_type)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, CreditTransactionRow>(
            r#"
            SELECT * FROM credit_transactions
            WHERE agent_id = $1
              AND ($2::credit_transaction_type IS NULL OR transaction_type = $2)
              AND ($3::timestamptz IS NULL OR created_at >= $3)
              AND ($4::timestamptz IS NULL OR created_at < $4)
            ORDER BY id DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.agent_id)
        .bind(filter.transaction_type)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Full history of an account in insertion order
    pub async fn ledger_history(&self, agent_id: i64) -> Result<Vec<CreditTransactionRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, CreditTransactionRow>(
            "SELECT * FROM credit_transactions WHERE agent_id = $1 ORDER BY id ASC",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ---------------------------------------------------------------------
    // Applications
    // ---------------------------------------------------------------------

    pub async fn insert_application(&self, app: &NewCreditApplicationRow) -> Result<CreditApplicationRow, DatabaseError> {
        let row = sqlx::query_as::<_, CreditApplicationRow>(
            r#"
            INSERT INTO credit_applications (application_no, agent_id, requested_amount, reason, submitted_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&app.application_no)
        .bind(app.agent_id)
        .bind(app.requested_amount)
        .bind(&app.reason)
        .bind(app.submitted_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_application(&self, id: i64) -> Result<Option<CreditApplicationRow>, DatabaseError> {
        let row = sqlx::query_as::<_, CreditApplicationRow>("SELECT * FROM credit_applications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn get_application_in(
        conn: &mut PgConnection,
        id: i64,
    ) -> Result<Option<CreditApplicationRow>, DatabaseError> {
        let row = sqlx::query_as::<_, CreditApplicationRow>("SELECT * FROM credit_applications WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    /// Moves a `pending` application to its decided state
    ///
    /// Returns `None` when the application is no longer pending (or absent).
    pub async fn decide_application_if_pending(
        conn: &mut PgConnection,
        decision: &ApplicationDecisionRow,
    ) -> Result<Option<CreditApplicationRow>, DatabaseError> {
        let row = sqlx::query_as::<_, CreditApplicationRow>(
            r#"
            UPDATE credit_applications SET
                status = $2,
                approved_amount = $3,
                admin_id = $4,
                admin_comment = $5,
                processed_at = $6
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(decision.id)
        .bind(decision.status)
        .bind(decision.approved_amount)
        .bind(decision.admin_id)
        .bind(&decision.admin_comment)
        .bind(decision.processed_at)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row)
    }

    /// One page of applications, newest first, with the total match count
    pub async fn list_applications(
        &self,
        agent_id: Option<i64>,
        status: Option<ApplicationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<CreditApplicationRow>, i64), DatabaseError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM credit_applications
            WHERE ($1::bigint IS NULL OR agent_id = $1)
              AND ($2::credit_application_status IS NULL OR status = $2)
            "#,
        )
        .bind(agent_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, CreditApplicationRow>(
            r#"
            SELECT * FROM credit_applications
            WHERE ($1::bigint IS NULL OR agent_id = $1)
              AND ($2::credit_application_status IS NULL OR status = $2)
            ORDER BY id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(agent_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }

    // ---------------------------------------------------------------------
    // Agents
    // ---------------------------------------------------------------------

    pub async fn find_agent(&self, agent_id: i64) -> Result<Option<AgentRow>, DatabaseError> {
        let row = sqlx::query_as::<_, AgentRow>(
            "SELECT agent_id, display_name, discount_rate, active FROM agents WHERE agent_id = $1",
        )
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

// ============================================================================
// Row Types
// ============================================================================

/// Database row for `credit_accounts`
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CreditAccountRow {
    pub agent_id: i64,
    pub total_credit: Decimal,
    pub used_credit: Decimal,
    pub deposit_balance: Decimal,
    pub credit_rating: String,
    pub interest_rate: Decimal,
    pub billing_cycle_day: i16,
    pub last_settlement_date: Option<NaiveDate>,
    pub overdraft_count: i32,
    pub is_frozen: bool,
    pub version: i64,
    pub last_modified_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for `credit_transactions`
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CreditTransactionRow {
    pub id: i64,
    pub transaction_no: String,
    pub agent_id: i64,
    pub booking_id: Option<i64>,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `credit_transactions`
#[derive(Debug, Clone)]
pub struct NewCreditTransactionRow {
    pub transaction_no: String,
    pub agent_id: i64,
    pub booking_id: Option<i64>,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub description: Option<String>,
    pub created_by: String,
}

/// Filter for [`CreditRepository::list_transactions`]
#[derive(Debug, Clone)]
pub struct TransactionFilter {
    pub agent_id: i64,
    pub transaction_type: Option<TransactionType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

/// Database row for `credit_applications`
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CreditApplicationRow {
    pub id: i64,
    pub application_no: String,
    pub agent_id: i64,
    pub requested_amount: Decimal,
    pub approved_amount: Option<Decimal>,
    pub status: ApplicationStatus,
    pub reason: Option<String>,
    pub admin_comment: Option<String>,
    pub admin_id: Option<i64>,
    pub submitted_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Insert payload for `credit_applications`
#[derive(Debug, Clone)]
pub struct NewCreditApplicationRow {
    pub application_no: String,
    pub agent_id: i64,
    pub requested_amount: Decimal,
    pub reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Update payload for a pending application
#[derive(Debug, Clone)]
pub struct ApplicationDecisionRow {
    pub id: i64,
    pub status: ApplicationStatus,
    pub approved_amount: Option<Decimal>,
    pub admin_id: i64,
    pub admin_comment: Option<String>,
    pub processed_at: DateTime<Utc>,
}

/// Database row for the agency's `agents` table
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AgentRow {
    pub agent_id: i64,
    pub display_name: String,
    pub discount_rate: Decimal,
    pub active: bool,
}

// ============================================================================
// Enum Types
// ============================================================================

/// Ledger entry type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "credit_transaction_type", rename_all = "snake_case")]
pub enum TransactionType {
    Granted,
    Used,
    Repaid,
    Topup,
}

/// Application status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "credit_application_status", rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}
