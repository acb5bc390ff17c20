//! Property tests: arbitrary operation sequences keep the ledger consistent

mod common;

use proptest::prelude::*;
use rust_decimal::Decimal;

use common::{admin, Harness};
use domain_credit::{verify_ledger, CreditCommand, CreditKind, CreditLedgerPort, DebitCommand};

#[derive(Debug, Clone)]
enum Op {
    Debit(i64),
    Repay(i64),
    Topup(i64),
    Limit(i64),
    Freeze(bool),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1i64..200_000).prop_map(Op::Debit),
        2 => (1i64..150_000).prop_map(Op::Repay),
        1 => (1i64..50_000).prop_map(Op::Topup),
        1 => (0i64..500_000).prop_map(Op::Limit),
        1 => any::<bool>().prop_map(Op::Freeze),
    ]
}

fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn ledger_replays_to_stored_state(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let h = Harness::new();
            let agent = h.funded_agent(1, cents(100_000)).await;
            let ctx = admin();

            for op in ops {
                let _ = match op {
                    Op::Debit(v) => h.engine.debit(DebitCommand::new(agent, None, cents(v)), &ctx).await.map(|_| ()),
                    Op::Repay(v) => h
                        .engine
                        .credit(CreditCommand::new(agent, cents(v), CreditKind::Repaid, None), &ctx)
                        .await
                        .map(|_| ()),
                    Op::Topup(v) => h
                        .engine
                        .credit(CreditCommand::new(agent, cents(v), CreditKind::Topup, None), &ctx)
                        .await
                        .map(|_| ()),
                    Op::Limit(v) => h.engine.adjust_limit(agent, cents(v), &ctx).await.map(|_| ()),
                    Op::Freeze(true) => h.engine.freeze(agent, &ctx).await.map(|_| ()),
                    Op::Freeze(false) => h.engine.unfreeze(agent, &ctx).await.map(|_| ()),
                };

                let account = h.ledger.get_account(agent).await.unwrap().unwrap();
                prop_assert!(account.used_credit >= Decimal::ZERO);
                prop_assert!(account.deposit_balance >= Decimal::ZERO);
            }

            let account = h.ledger.get_account(agent).await.unwrap().unwrap();
            let history = h.ledger.ledger_history(agent).await.unwrap();
            let report = verify_ledger(&account, &history);
            prop_assert!(report.is_consistent(), "{:?}", report.issues);
            Ok(())
        })?;
    }
}
