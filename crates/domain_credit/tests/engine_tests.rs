//! Tests for the credit account engine and its concurrency discipline

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use rust_decimal_macros::dec;

use common::{admin, overdraft_policy, ContendedLedger, Harness};
use core_kernel::{AgentId, BookingId, TransactionNo};
use domain_credit::{
    verify_ledger, ConflictType, CreditAccountEngine, CreditCommand, CreditError, CreditKind,
    CreditLedgerPort, CreditPolicy, DebitCommand, PageRequest, RequestContext, TransactionQuery,
    TransactionType, DateRange,
};

fn debit(agent_id: AgentId, amount: rust_decimal::Decimal) -> DebitCommand {
    DebitCommand::new(agent_id, Some(BookingId::new(77)), amount)
}

// ============= BALANCE TESTS =============
mod balance_tests {
    use super::*;

    #[tokio::test]
    async fn test_open_account_records_initial_grant() {
        let h = Harness::new();
        let agent = h.funded_agent(1, dec!(1000)).await;

        let view = h.engine.get_balance(agent).await.unwrap();
        assert_eq!(view.total_credit, dec!(1000));
        assert_eq!(view.available_credit, dec!(1000));
        assert_eq!(view.version, 1);

        let history = h.ledger.ledger_history(agent).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].transaction_type, TransactionType::Granted);
        assert_eq!(history[0].balance_before, dec!(0));
        assert_eq!(history[0].balance_after, dec!(1000));
    }

    #[tokio::test]
    async fn test_open_account_rejects_unknown_and_duplicate() {
        let h = Harness::new();
        let err = h.engine.open_account(AgentId::new(404), dec!(100), &admin()).await.unwrap_err();
        assert!(matches!(err, CreditError::NotFound { entity: "Agent", .. }));

        let agent = h.funded_agent(2, dec!(100)).await;
        let err = h.engine.open_account(agent, dec!(100), &admin()).await.unwrap_err();
        assert!(matches!(err, CreditError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_account_is_not_found() {
        let h = Harness::new();
        let err = h.engine.get_balance(AgentId::new(9)).await.unwrap_err();
        assert!(matches!(err, CreditError::NotFound { entity: "CreditAccount", .. }));
    }
}

// ============= DEBIT / CREDIT TESTS =============
mod ledger_tests {
    use super::*;

    #[tokio::test]
    async fn test_booking_paid_on_credit() {
        let h = Harness::new();
        let agent = h.funded_agent(1, dec!(1000)).await;
        let ctx = RequestContext::agent(agent);

        let receipt = h.engine.debit(debit(agent, dec!(300)), &ctx).await.unwrap();
        assert!(!receipt.replayed);
        assert_eq!(receipt.account.used_credit, dec!(300));
        assert_eq!(receipt.account.available_credit, dec!(700));
        assert_eq!(receipt.transaction.transaction_type, TransactionType::Used);
        assert_eq!(receipt.transaction.balance_before, dec!(1000));
        assert_eq!(receipt.transaction.balance_after, dec!(700));
        assert_eq!(receipt.transaction.booking_id, Some(BookingId::new(77)));
        assert_eq!(receipt.transaction.created_by, agent.to_string());

        let err = h.engine.debit(debit(agent, dec!(800)), &ctx).await.unwrap_err();
        assert_eq!(err.shortfall(), Some(dec!(100)));

        let view = h.engine.get_balance(agent).await.unwrap();
        assert_eq!(view.used_credit, dec!(300));
        assert_eq!(h.ledger.ledger_history(agent).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_rejected_without_writing() {
        let h = Harness::new();
        let agent = h.funded_agent(1, dec!(1000)).await;

        for amount in [dec!(0), dec!(-5)] {
            let err = h.engine.debit(debit(agent, amount), &admin()).await.unwrap_err();
            assert!(matches!(err, CreditError::Validation(_)));
        }
        assert_eq!(h.engine.get_balance(agent).await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_repayment_pays_down_then_deposits() {
        let h = Harness::new();
        let agent = h.funded_agent(1, dec!(1000)).await;
        h.engine.debit(debit(agent, dec!(300)), &admin()).await.unwrap();

        let receipt = h
            .engine
            .credit(CreditCommand::new(agent, dec!(500), CreditKind::Repaid, None), &admin())
            .await
            .unwrap();
        assert_eq!(receipt.account.used_credit, dec!(0));
        assert_eq!(receipt.account.deposit_balance, dec!(200));
        assert_eq!(receipt.transaction.balance_before, dec!(700));
        assert_eq!(receipt.transaction.balance_after, dec!(1200));
    }

    #[tokio::test]
    async fn test_limit_changes_are_ledgered() {
        let h = Harness::new();
        let agent = h.funded_agent(1, dec!(1000)).await;

        let view = h.engine.adjust_limit(agent, dec!(1500), &admin()).await.unwrap();
        assert_eq!(view.total_credit, dec!(1500));
        h.engine.adjust_limit(agent, dec!(1200), &admin()).await.unwrap();
        h.engine.adjust_limit(agent, dec!(1200), &admin()).await.unwrap();

        let granted = h
            .ledger
            .list_transactions(&TransactionQuery {
                agent_id: agent,
                transaction_type: Some(TransactionType::Granted),
                range: DateRange::all(),
                page: PageRequest::first(20),
            })
            .await
            .unwrap();
        let amounts: Vec<_> = granted.items.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![dec!(300), dec!(500), dec!(1000)]);

        let err = h.engine.adjust_limit(agent, dec!(-1), &admin()).await.unwrap_err();
        assert!(matches!(err, CreditError::Validation(_)));
    }

    #[tokio::test]
    async fn test_lowering_limit_below_usage_blocks_debits() {
        let h = Harness::new();
        let agent = h.funded_agent(1, dec!(1000)).await;
        h.engine.debit(debit(agent, dec!(600)), &admin()).await.unwrap();

        let view = h.engine.adjust_limit(agent, dec!(500), &admin()).await.unwrap();
        assert_eq!(view.available_credit, dec!(-100));

        let err = h.engine.debit(debit(agent, dec!(1)), &admin()).await.unwrap_err();
        assert_eq!(err.shortfall(), Some(dec!(101)));
    }

    #[tokio::test]
    async fn test_history_replays_to_stored_state() {
        let h = Harness::new();
        let agent = h.funded_agent(1, dec!(1000)).await;
        h.engine.debit(debit(agent, dec!(400)), &admin()).await.unwrap();
        h.engine.adjust_limit(agent, dec!(2000), &admin()).await.unwrap();
        h.engine
            .credit(CreditCommand::new(agent, dec!(150), CreditKind::Repaid, None), &admin())
            .await
            .unwrap();
        h.engine
            .credit(CreditCommand::new(agent, dec!(500), CreditKind::Topup, None), &admin())
            .await
            .unwrap();
        h.engine.debit(debit(agent, dec!(90.50)), &admin()).await.unwrap();

        let account = h.ledger.get_account(agent).await.unwrap().unwrap();
        let history = h.ledger.ledger_history(agent).await.unwrap();
        let report = verify_ledger(&account, &history);
        assert!(report.is_consistent(), "{:?}", report.issues);
        assert_eq!(account.used_credit, dec!(90.50));
    }
}

// ============= FREEZE TESTS =============
mod freeze_tests {
    use super::*;

    #[tokio::test]
    async fn test_frozen_account_rejects_debits_but_accepts_repayments() {
        let h = Harness::new();
        let agent = h.funded_agent(1, dec!(1000)).await;
        h.engine.debit(debit(agent, dec!(100)), &admin()).await.unwrap();

        let view = h.engine.freeze(agent, &admin()).await.unwrap();
        assert!(view.is_frozen);

        let err = h.engine.debit(debit(agent, dec!(10)), &admin()).await.unwrap_err();
        assert!(matches!(err, CreditError::FrozenAccount(id) if id == agent));

        let check = h.engine.check_payment(agent, dec!(10)).await.unwrap();
        assert!(check.sufficient);
        assert!(!check.payable);

        h.engine
            .credit(CreditCommand::new(agent, dec!(100), CreditKind::Repaid, None), &admin())
            .await
            .unwrap();

        let view = h.engine.unfreeze(agent, &admin()).await.unwrap();
        assert!(!view.is_frozen);
        h.engine.debit(debit(agent, dec!(10)), &admin()).await.unwrap();
    }

    #[tokio::test]
    async fn test_freeze_is_idempotent_and_not_ledgered() {
        let h = Harness::new();
        let agent = h.funded_agent(1, dec!(1000)).await;

        let first = h.engine.freeze(agent, &admin()).await.unwrap();
        let second = h.engine.freeze(agent, &admin()).await.unwrap();
        assert_eq!(first.version, second.version);
        assert_eq!(h.ledger.ledger_history(agent).await.unwrap().len(), 1);
    }
}

// ============= PAYMENT CHECK TESTS =============
mod payment_check_tests {
    use super::*;

    #[tokio::test]
    async fn test_check_payment_reports_shortfall_without_writing() {
        let h = Harness::new();
        let agent = h.funded_agent(1, dec!(500)).await;

        let check = h.engine.check_payment(agent, dec!(650)).await.unwrap();
        assert!(!check.sufficient);
        assert_eq!(check.shortfall, dec!(150));
        assert_eq!(check.available_credit, dec!(500));

        let check = h.engine.check_payment(agent, dec!(500)).await.unwrap();
        assert!(check.payable);
        assert_eq!(check.shortfall, dec!(0));
        assert_eq!(h.engine.get_balance(agent).await.unwrap().version, 1);
    }
}

// ============= OVERDRAFT TESTS =============
mod overdraft_tests {
    use super::*;

    #[tokio::test]
    async fn test_overdraft_requires_policy_and_call_authorisation() {
        let h = Harness::with_policy(overdraft_policy(dec!(200)));
        let agent = h.funded_agent(1, dec!(1000)).await;

        let err = h.engine.debit(debit(agent, dec!(1100)), &admin()).await.unwrap_err();
        assert_eq!(err.shortfall(), Some(dec!(100)));

        let mut cmd = debit(agent, dec!(1100));
        cmd.allow_overdraft = true;
        let receipt = h.engine.debit(cmd, &admin()).await.unwrap();
        assert_eq!(receipt.account.available_credit, dec!(-100));
        assert_eq!(receipt.account.overdraft_count, 1);

        let mut cmd = debit(agent, dec!(101));
        cmd.allow_overdraft = true;
        assert!(h.engine.debit(cmd, &admin()).await.is_err());
    }

    #[tokio::test]
    async fn test_default_policy_never_overdraws() {
        let h = Harness::new();
        let agent = h.funded_agent(1, dec!(100)).await;
        let mut cmd = debit(agent, dec!(100.01));
        cmd.allow_overdraft = true;
        let err = h.engine.debit(cmd, &admin()).await.unwrap_err();
        assert_eq!(err.shortfall(), Some(dec!(0.01)));
    }
}

// ============= IDEMPOTENCE TESTS =============
mod idempotence_tests {
    use super::*;

    #[tokio::test]
    async fn test_repeated_transaction_number_replays() {
        let h = Harness::new();
        let agent = h.funded_agent(1, dec!(1000)).await;
        let txn_no = TransactionNo::parse("BOOKING-77-PAY").unwrap();

        let mut cmd = debit(agent, dec!(250));
        cmd.transaction_no = Some(txn_no.clone());
        let first = h.engine.debit(cmd.clone(), &admin()).await.unwrap();
        let second = h.engine.debit(cmd, &admin()).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.transaction, second.transaction);
        assert_eq!(second.account.used_credit, dec!(250));
        assert_eq!(h.ledger.ledger_history(agent).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_transaction_number_cannot_be_reused_for_another_operation() {
        let h = Harness::new();
        let agent = h.funded_agent(1, dec!(1000)).await;
        let txn_no = TransactionNo::parse("SHARED-1").unwrap();

        let mut cmd = debit(agent, dec!(50));
        cmd.transaction_no = Some(txn_no.clone());
        h.engine.debit(cmd, &admin()).await.unwrap();

        let mut repay = CreditCommand::new(agent, dec!(50), CreditKind::Repaid, None);
        repay.transaction_no = Some(txn_no);
        let err = h.engine.credit(repay, &admin()).await.unwrap_err();
        assert!(matches!(err, CreditError::Validation(_)));
    }
}

// ============= CONCURRENCY TESTS =============
mod concurrency_tests {
    use super::*;

    #[tokio::test]
    async fn test_concurrent_debits_never_overdraw() {
        let h = Harness::new();
        let agent = h.funded_agent(1, dec!(1000)).await;
        let ctx = RequestContext::agent(agent);

        let (a, b) = tokio::join!(
            h.engine.debit(debit(agent, dec!(700)), &ctx),
            h.engine.debit(debit(agent, dec!(700)), &ctx),
        );
        let results = [a, b];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);

        let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(failure.shortfall(), Some(dec!(400)));

        let view = h.engine.get_balance(agent).await.unwrap();
        assert_eq!(view.used_credit, dec!(700));
        assert_eq!(view.available_credit, dec!(300));

        let used: Vec<_> = h
            .ledger
            .ledger_history(agent)
            .await
            .unwrap()
            .into_iter()
            .filter(|entry| entry.transaction_type == TransactionType::Used)
            .collect();
        assert_eq!(used.len(), 1);
        assert_eq!(used[0].amount, dec!(700));
    }

    #[tokio::test]
    async fn test_many_parallel_debits_stay_within_limit() {
        let h = Harness::new();
        let agent = h.funded_agent(1, dec!(1000)).await;
        let policy = CreditPolicy {
            max_retries: 50,
            ..CreditPolicy::default()
        };
        let engine = Arc::new(CreditAccountEngine::new(h.ledger.clone(), h.directory.clone(), policy));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine
                        .debit(debit(agent, dec!(75)), &RequestContext::agent(agent))
                        .await
                })
            })
            .collect();

        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 13);

        let account = h.ledger.get_account(agent).await.unwrap().unwrap();
        assert_eq!(account.used_credit, dec!(975));
        let history = h.ledger.ledger_history(agent).await.unwrap();
        assert!(verify_ledger(&account, &history).is_consistent());
    }

    #[tokio::test]
    async fn test_lost_races_are_retried() {
        let h = Harness::new();
        let agent = h.funded_agent(1, dec!(1000)).await;
        let contended = Arc::new(ContendedLedger::new(h.ledger.clone(), 3));
        let engine = CreditAccountEngine::new(contended.clone(), h.directory.clone(), CreditPolicy::default());

        let receipt = engine.debit(debit(agent, dec!(100)), &admin()).await.unwrap();
        assert_eq!(receipt.account.used_credit, dec!(100));
        assert_eq!(contended.commits.load(Ordering::SeqCst), 4);
        assert_eq!(receipt.account.version, 5);
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_reports_version_conflict() {
        let h = Harness::new();
        let agent = h.funded_agent(1, dec!(1000)).await;
        let contended = Arc::new(ContendedLedger::new(h.ledger.clone(), 4));
        let engine = CreditAccountEngine::new(contended.clone(), h.directory.clone(), CreditPolicy::default());

        let err = engine.debit(debit(agent, dec!(100)), &admin()).await.unwrap_err();
        let conflict = err.conflict().expect("conflict detail");
        assert_eq!(conflict.conflict_type, ConflictType::Version);
        assert_eq!(conflict.last_modified_by.as_deref(), Some("competitor"));
        assert!(conflict.current_version > conflict.expected_version);
        assert_eq!(contended.commits.load(Ordering::SeqCst), 4);

        let view = h.engine.get_balance(agent).await.unwrap();
        assert_eq!(view.used_credit, dec!(0));
        assert_eq!(h.ledger.ledger_history(agent).await.unwrap().len(), 1);
    }
}
