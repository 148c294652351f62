//! Property-based tests using proptest.
//!
//! For any sequence of movements, the stock balance never goes negative and
//! always equals the sum of committed ledger deltas.

mod common;

use common::*;
use proptest::prelude::*;
use stock_ledger::domain::MovementDirection;
use stock_ledger::{LedgerError, LedgerStore};

#[derive(Debug, Clone)]
struct Op {
    exit: bool,
    quantity: i64,
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        (any::<bool>(), 1i64..20).prop_map(|(exit, quantity)| Op { exit, quantity }),
        1..30,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn stock_matches_committed_ledger(initial in 0i64..50, ops in arb_ops()) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async move {
            let (_dir, store) = temp_store().await;
            let product_id = seed_product(&store, "Prop Widget", initial).await;

            let mut expected = initial;
            for op in ops {
                if op.exit {
                    match store
                        .apply_exit(movement(product_id, op.quantity, MovementDirection::Exit))
                        .await
                    {
                        Ok(applied) => {
                            expected -= op.quantity;
                            assert_eq!(applied.product.current_stock, expected);
                        }
                        Err(LedgerError::InsufficientStock { available, .. }) => {
                            assert_eq!(available, expected);
                            assert!(op.quantity > expected);
                        }
                        Err(e) => panic!("unexpected error: {e:?}"),
                    }
                } else {
                    let applied = store
                        .apply_entry(movement(product_id, op.quantity, MovementDirection::Entry))
                        .await
                        .unwrap();
                    expected += op.quantity;
                    assert_eq!(applied.product.current_stock, expected);
                }

                assert!(expected >= 0, "stock invariant violated");
            }

            // The balance equals the sum of committed ledger deltas.
            let entries = store.entries_by_product(product_id).await.unwrap();
            let delta: i64 = entries
                .iter()
                .map(|e| match e.direction {
                    MovementDirection::Entry => e.quantity,
                    MovementDirection::Exit => -e.quantity,
                })
                .sum();

            let product = store.product_by_id(product_id).await.unwrap().unwrap();
            assert_eq!(product.current_stock, initial + delta);
            assert_eq!(product.current_stock, expected);
        });
    }
}
