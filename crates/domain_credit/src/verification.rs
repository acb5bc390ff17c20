//! Ledger consistency verification
//!
//! Replays an account's history and checks it against the stored row:
//! each entry must honour its type's sign convention, consecutive entries
//! must chain (`after` of one is `before` of the next, starting from zero),
//! the last `balance_after` must equal the account position, and the net of
//! `USED` minus paid-down amounts must equal `used_credit`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{AgentId, TransactionNo};

use crate::account::CreditAccount;
use crate::transaction::{CreditTransaction, TransactionType};

/// One inconsistency found while replaying
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerIssue {
    /// The entry's before/after pair contradicts its type and amount
    UnbalancedEntry { transaction_no: TransactionNo },
    /// The entry does not start where the previous one ended
    BrokenChain {
        transaction_no: TransactionNo,
        expected_before: Decimal,
        actual_before: Decimal,
    },
    /// Replayed usage differs from the stored `used_credit`
    UsedCreditMismatch { replayed: Decimal, stored: Decimal },
    /// The last entry does not end at the stored position
    FinalBalanceMismatch { ledger: Decimal, account: Decimal },
}

/// Verification report for one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerVerification {
    pub agent_id: AgentId,
    pub entries_checked: usize,
    pub replayed_used_credit: Decimal,
    pub stored_used_credit: Decimal,
    pub issues: Vec<LedgerIssue>,
}

impl LedgerVerification {
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Checks `history` (in insertion order) against `account`
pub fn verify_ledger(account: &CreditAccount, history: &[CreditTransaction]) -> LedgerVerification {
    let mut issues = Vec::new();
    let mut expected_before = Decimal::ZERO;
    let mut used = Decimal::ZERO;

    for entry in history {
        if !entry.is_balanced() {
            issues.push(LedgerIssue::UnbalancedEntry {
                transaction_no: entry.transaction_no.clone(),
            });
        }
        if entry.balance_before != expected_before {
            issues.push(LedgerIssue::BrokenChain {
                transaction_no: entry.transaction_no.clone(),
                expected_before,
                actual_before: entry.balance_before,
            });
        }
        expected_before = entry.balance_after;

        match entry.transaction_type {
            TransactionType::Used => used += entry.amount,
            TransactionType::Repaid | TransactionType::Topup => {
                used -= entry.amount.min(used);
            }
            TransactionType::Granted => {}
        }
    }

    if used != account.used_credit {
        issues.push(LedgerIssue::UsedCreditMismatch {
            replayed: used,
            stored: account.used_credit,
        });
    }

    if expected_before != account.position() {
        issues.push(LedgerIssue::FinalBalanceMismatch {
            ledger: expected_before,
            account: account.position(),
        });
    }

    LedgerVerification {
        agent_id: account.agent_id,
        entries_checked: history.len(),
        replayed_used_credit: used,
        stored_used_credit: account.used_credit,
        issues,
    }
}
