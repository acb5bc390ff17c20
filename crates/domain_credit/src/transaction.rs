//! Ledger entries
//!
//! Credit transactions are immutable once written. Each entry records the
//! account position before and after the change so that the history can be
//! replayed and checked link by link.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{AgentId, BookingId, TransactionNo};

use crate::account::CreditAccount;

/// Kind of balance-affecting event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// The approved limit changed
    Granted,
    /// A booking was paid on credit
    Used,
    /// The agent repaid outstanding usage
    Repaid,
    /// An administrator added funds
    Topup,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Granted => "GRANTED",
            TransactionType::Used => "USED",
            TransactionType::Repaid => "REPAID",
            TransactionType::Topup => "TOPUP",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "GRANTED" => Some(TransactionType::Granted),
            "USED" => Some(TransactionType::Used),
            "REPAID" => Some(TransactionType::Repaid),
            "TOPUP" => Some(TransactionType::Topup),
            _ => None,
        }
    }

    /// Returns true for repayments and top-ups
    pub fn is_credit(&self) -> bool {
        matches!(self, TransactionType::Repaid | TransactionType::Topup)
    }
}

/// A persisted ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: i64,
    pub transaction_no: TransactionNo,
    pub agent_id: AgentId,
    pub booking_id: Option<BookingId>,
    pub transaction_type: TransactionType,
    /// Always positive; direction comes from the type
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    /// Checks the entry's before/after pair against its type's sign convention
    pub fn is_balanced(&self) -> bool {
        if self.amount <= Decimal::ZERO {
            return false;
        }
        let delta = self.balance_after - self.balance_before;
        match self.transaction_type {
            TransactionType::Used => delta == -self.amount,
            TransactionType::Repaid | TransactionType::Topup => delta == self.amount,
            TransactionType::Granted => delta.abs() == self.amount,
        }
    }
}

/// An entry about to be appended, before the store assigns `id` and `created_at`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCreditTransaction {
    pub transaction_no: TransactionNo,
    pub agent_id: AgentId,
    pub booking_id: Option<BookingId>,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub description: Option<String>,
    pub created_by: String,
}

impl NewCreditTransaction {
    /// Records the transition from `before` to `after`
    pub fn between(
        transaction_no: TransactionNo,
        transaction_type: TransactionType,
        amount: Decimal,
        before: &CreditAccount,
        after: &CreditAccount,
        booking_id: Option<BookingId>,
        description: Option<String>,
        actor: &str,
    ) -> Self {
        Self {
            transaction_no,
            agent_id: before.agent_id,
            booking_id,
            transaction_type,
            amount,
            balance_before: before.position(),
            balance_after: after.position(),
            description,
            created_by: actor.to_string(),
        }
    }

    /// Materialises the entry as the store would persist it
    pub fn into_transaction(self, id: i64, created_at: DateTime<Utc>) -> CreditTransaction {
        CreditTransaction {
            id,
            transaction_no: self.transaction_no,
            agent_id: self.agent_id,
            booking_id: self.booking_id,
            transaction_type: self.transaction_type,
            amount: self.amount,
            balance_before: self.balance_before,
            balance_after: self.balance_after,
            description: self.description,
            created_by: self.created_by,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(kind: TransactionType, amount: Decimal, before: Decimal, after: Decimal) -> CreditTransaction {
        CreditTransaction {
            id: 1,
            transaction_no: TransactionNo::generate(),
            agent_id: AgentId::new(1),
            booking_id: None,
            transaction_type: kind,
            amount,
            balance_before: before,
            balance_after: after,
            description: None,
            created_by: "test".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_sign_conventions() {
        assert!(entry(TransactionType::Used, dec!(300), dec!(1000), dec!(700)).is_balanced());
        assert!(!entry(TransactionType::Used, dec!(300), dec!(1000), dec!(1300)).is_balanced());
        assert!(entry(TransactionType::Repaid, dec!(300), dec!(700), dec!(1000)).is_balanced());
        assert!(entry(TransactionType::Topup, dec!(50), dec!(0), dec!(50)).is_balanced());
        assert!(entry(TransactionType::Granted, dec!(500), dec!(1000), dec!(500)).is_balanced());
        assert!(!entry(TransactionType::Topup, dec!(0), dec!(0), dec!(0)).is_balanced());
    }

    #[test]
    fn test_type_round_trip() {
        for kind in [
            TransactionType::Granted,
            TransactionType::Used,
            TransactionType::Repaid,
            TransactionType::Topup,
        ] {
            assert_eq!(TransactionType::parse(kind.as_str()), Some(kind));
        }
    }
}
