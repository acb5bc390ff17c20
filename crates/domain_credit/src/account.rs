//! Credit accounts
//!
//! One account per agent. Every mutation is planned here as a pure function
//! from the current row to the next row, with the version already bumped;
//! the concurrency controller then writes it conditioned on the old version.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{normalize_amount, AgentId};

use crate::error::CreditError;
use crate::policy::OverdraftPolicy;

/// Internal credit grade assigned by the credit team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditRating {
    A,
    B,
    C,
    D,
}

impl CreditRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditRating::A => "A",
            CreditRating::B => "B",
            CreditRating::C => "C",
            CreditRating::D => "D",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "A" => Some(CreditRating::A),
            "B" => Some(CreditRating::B),
            "C" => Some(CreditRating::C),
            "D" => Some(CreditRating::D),
            _ => None,
        }
    }
}

/// Persistent credit account state
///
/// # Invariants
///
/// - `used_credit >= 0` and `deposit_balance >= 0`
/// - `version` strictly increases with every successful write
/// - `is_frozen` blocks every debit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAccount {
    pub agent_id: AgentId,
    pub total_credit: Decimal,
    pub used_credit: Decimal,
    pub deposit_balance: Decimal,
    pub credit_rating: CreditRating,
    pub interest_rate: Decimal,
    /// Day of month (1-28) on which the billing cycle closes
    pub billing_cycle_day: i16,
    pub last_settlement_date: Option<NaiveDate>,
    /// Number of debits that were allowed to run past the limit
    pub overdraft_count: i32,
    pub is_frozen: bool,
    pub version: i64,
    pub last_modified_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreditAccount {
    /// Creates the first version of an account
    pub fn open(agent_id: AgentId, total_credit: Decimal, actor: &str, now: DateTime<Utc>) -> Self {
        Self {
            agent_id,
            total_credit: normalize_amount(total_credit),
            used_credit: Decimal::ZERO,
            deposit_balance: Decimal::ZERO,
            credit_rating: CreditRating::B,
            interest_rate: Decimal::ZERO,
            billing_cycle_day: 1,
            last_settlement_date: None,
            overdraft_count: 0,
            is_frozen: false,
            version: 1,
            last_modified_by: Some(actor.to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Remaining credit line (`total - used`); negative only after an overdraft
    pub fn available_credit(&self) -> Decimal {
        self.total_credit - self.used_credit
    }

    /// Running balance recorded on ledger entries
    pub fn position(&self) -> Decimal {
        self.available_credit() + self.deposit_balance
    }

    /// Share of the limit in use, in percent with two decimals
    pub fn usage_percentage(&self) -> Decimal {
        if self.total_credit.is_zero() {
            return Decimal::ZERO;
        }
        (self.used_credit / self.total_credit * dec!(100)).round_dp(2)
    }

    /// Copy of this account stamped as the next version
    fn next_version(&self, actor: &str, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.version = self.version + 1;
        next.last_modified_by = Some(actor.to_string());
        next.updated_at = now;
        next
    }

    /// Plans a debit of `amount`
    ///
    /// # Errors
    ///
    /// - `FrozenAccount` when the account is frozen
    /// - `InsufficientCredit` when available credit does not cover the
    ///   amount and the overdraft policy does not permit the deficit
    pub fn plan_debit(
        &self,
        amount: Decimal,
        overdraft_authorized: bool,
        overdraft: &OverdraftPolicy,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, CreditError> {
        if self.is_frozen {
            return Err(CreditError::FrozenAccount(self.agent_id));
        }

        let available = self.available_credit();
        let mut next = self.next_version(actor, now);

        if available < amount {
            if !overdraft.permits(overdraft_authorized, available - amount) {
                return Err(CreditError::InsufficientCredit {
                    requested: amount,
                    available,
                    shortfall: amount - available,
                });
            }
            next.overdraft_count += 1;
        }

        next.used_credit = self.used_credit + amount;
        Ok(next)
    }

    /// Plans a repayment or top-up of `amount`
    ///
    /// Outstanding usage is paid down first; any remainder is kept as deposit.
    pub fn plan_credit(&self, amount: Decimal, actor: &str, now: DateTime<Utc>) -> Self {
        let applied = amount.min(self.used_credit);
        let mut next = self.next_version(actor, now);
        next.used_credit = self.used_credit - applied;
        next.deposit_balance = self.deposit_balance + (amount - applied);
        next
    }

    /// Plans a change of the approved limit
    pub fn plan_limit(&self, new_total: Decimal, actor: &str, now: DateTime<Utc>) -> Result<Self, CreditError> {
        let new_total = normalize_amount(new_total);
        if new_total < Decimal::ZERO {
            return Err(CreditError::validation(format!(
                "credit limit must not be negative, got {}",
                new_total
            )));
        }
        let mut next = self.next_version(actor, now);
        next.total_credit = new_total;
        Ok(next)
    }

    /// Plans a freeze or unfreeze
    pub fn plan_freeze(&self, frozen: bool, actor: &str, now: DateTime<Utc>) -> Self {
        let mut next = self.next_version(actor, now);
        next.is_frozen = frozen;
        next
    }

    pub fn view(&self) -> CreditAccountView {
        CreditAccountView::from(self)
    }
}

/// Read-only projection handed to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAccountView {
    pub agent_id: AgentId,
    pub total_credit: Decimal,
    pub used_credit: Decimal,
    pub available_credit: Decimal,
    pub deposit_balance: Decimal,
    pub credit_rating: CreditRating,
    pub interest_rate: Decimal,
    pub billing_cycle_day: i16,
    pub last_settlement_date: Option<NaiveDate>,
    pub overdraft_count: i32,
    pub is_frozen: bool,
    pub usage_percentage: Decimal,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<&CreditAccount> for CreditAccountView {
    fn from(account: &CreditAccount) -> Self {
        Self {
            agent_id: account.agent_id,
            total_credit: account.total_credit,
            used_credit: account.used_credit,
            available_credit: account.available_credit(),
            deposit_balance: account.deposit_balance,
            credit_rating: account.credit_rating,
            interest_rate: account.interest_rate,
            billing_cycle_day: account.billing_cycle_day,
            last_settlement_date: account.last_settlement_date,
            overdraft_count: account.overdraft_count,
            is_frozen: account.is_frozen,
            usage_percentage: account.usage_percentage(),
            version: account.version,
            updated_at: account.updated_at,
        }
    }
}
