//! Test Data Builders
//!
//! Builders for domain values with sensible defaults, so tests only spell
//! out the fields they care about.

use chrono::{DateTime, Utc};
use core_kernel::AgentId;
use domain_credit::{CreditAccount, CreditRating};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::fixtures::{AgentFixtures, TemporalFixtures};

/// Builder for `CreditAccount` snapshots
pub struct CreditAccountBuilder {
    agent_id: AgentId,
    total_credit: Decimal,
    used_credit: Decimal,
    deposit_balance: Decimal,
    credit_rating: CreditRating,
    is_frozen: bool,
    version: i64,
    at: DateTime<Utc>,
}

impl Default for CreditAccountBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CreditAccountBuilder {
    /// Creates a new builder with default values
    pub fn new() -> Self {
        Self {
            agent_id: AgentFixtures::agent_id(),
            total_credit: dec!(1000),
            used_credit: Decimal::ZERO,
            deposit_balance: Decimal::ZERO,
            credit_rating: CreditRating::B,
            is_frozen: false,
            version: 1,
            at: TemporalFixtures::start_of_2024(),
        }
    }

    pub fn with_agent(mut self, agent_id: AgentId) -> Self {
        self.agent_id = agent_id;
        self
    }

    pub fn with_limit(mut self, total: Decimal) -> Self {
        self.total_credit = total;
        self
    }

    pub fn with_used(mut self, used: Decimal) -> Self {
        self.used_credit = used;
        self
    }

    pub fn with_deposit(mut self, deposit: Decimal) -> Self {
        self.deposit_balance = deposit;
        self
    }

    pub fn with_rating(mut self, rating: CreditRating) -> Self {
        self.credit_rating = rating;
        self
    }

    pub fn frozen(mut self) -> Self {
        self.is_frozen = true;
        self
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    /// Builds the account snapshot
    pub fn build(self) -> CreditAccount {
        let mut account = CreditAccount::open(self.agent_id, self.total_credit, "test-builder", self.at);
        account.used_credit = self.used_credit;
        account.deposit_balance = self.deposit_balance;
        account.credit_rating = self.credit_rating;
        account.is_frozen = self.is_frozen;
        account.version = self.version;
        account
    }
}
