//! Property-Based Test Generators
//!
//! Proptest strategies for amounts and ledger operations.

use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for strictly positive amounts with two decimal places
pub fn positive_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for non-negative credit limits
pub fn limit_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..50_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for amounts that are zero or negative
pub fn non_positive_amount_strategy() -> impl Strategy<Value = Decimal> {
    (-10_000_000i64..=0i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// A balance-affecting operation
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerOp {
    Debit(Decimal),
    Repay(Decimal),
    Topup(Decimal),
    AdjustLimit(Decimal),
}

/// Strategy for a single ledger operation, weighted toward debits
pub fn ledger_op_strategy() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        4 => positive_amount_strategy().prop_map(LedgerOp::Debit),
        2 => positive_amount_strategy().prop_map(LedgerOp::Repay),
        1 => positive_amount_strategy().prop_map(LedgerOp::Topup),
        1 => limit_strategy().prop_map(LedgerOp::AdjustLimit),
    ]
}

/// Strategy for operation sequences of up to `max_len` steps
pub fn ledger_ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<LedgerOp>> {
    prop::collection::vec(ledger_op_strategy(), 1..=max_len.max(1))
}
