//! Custom Test Assertions
//!
//! Assertion helpers for credit types that give more meaningful failure
//! messages than plain `assert!`.

use domain_credit::{
    verify_ledger, ConflictType, CreditAccount, CreditAccountView, CreditError, CreditTransaction,
};
use rust_decimal::Decimal;

/// Asserts that the history replays exactly to the stored account
///
/// # Panics
///
/// Panics with the list of issues when the ledger is inconsistent
pub fn assert_ledger_consistent(account: &CreditAccount, history: &[CreditTransaction]) {
    let report = verify_ledger(account, history);
    assert!(
        report.is_consistent(),
        "Ledger for {} is inconsistent after {} entries: {:?}",
        account.agent_id,
        report.entries_checked,
        report.issues
    );
}

/// Asserts the balance figures of an account view
pub fn assert_balance(view: &CreditAccountView, total: Decimal, used: Decimal, available: Decimal) {
    assert_eq!(
        (view.total_credit, view.used_credit, view.available_credit),
        (total, used, available),
        "Unexpected balance for {}: expected total={} used={} available={}",
        view.agent_id,
        total,
        used,
        available
    );
}

/// Asserts an `InsufficientCredit` error with the given shortfall
pub fn assert_shortfall(result: &Result<impl std::fmt::Debug, CreditError>, expected: Decimal) {
    match result {
        Err(err @ CreditError::InsufficientCredit { .. }) => {
            assert_eq!(err.shortfall(), Some(expected), "Unexpected shortfall in {}", err);
        }
        other => panic!("Expected InsufficientCredit, got {:?}", other),
    }
}

/// Asserts a `ConcurrentEdit` error of the given conflict type
pub fn assert_conflict(result: &Result<impl std::fmt::Debug, CreditError>, expected: ConflictType) {
    match result {
        Err(CreditError::ConcurrentEdit(conflict)) => {
            assert_eq!(conflict.conflict_type, expected, "Unexpected conflict: {}", conflict);
        }
        other => panic!("Expected ConcurrentEdit, got {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_assert_shortfall_accepts_matching_error() {
        let result: Result<(), CreditError> = Err(CreditError::InsufficientCredit {
            requested: dec!(800),
            available: dec!(700),
            shortfall: dec!(100),
        });
        assert_shortfall(&result, dec!(100));
    }

    #[test]
    #[should_panic(expected = "Expected InsufficientCredit")]
    fn test_assert_shortfall_rejects_success() {
        let result: Result<(), CreditError> = Ok(());
        assert_shortfall(&result, dec!(1));
    }
}
