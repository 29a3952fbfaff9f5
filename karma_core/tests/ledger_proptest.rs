/// Property-based tests for ledger and valuation invariants using proptest
///
/// Ledger properties run against the in-memory store: balances never go
/// negative, every operation moves balances by exactly its amount, and
/// gifts conserve the total amount of karma in circulation.
use karma_core::db::InMemoryStore;
use karma_core::valuation::{Condition, FLOOR_VALUE, ValuationInput, valuate};
use karma_core::wallet::{TransactionType, WalletError, WalletManager};
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum LedgerOp {
    Add(i64),
    Deduct(i64),
}

fn ledger_op_strategy() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        (1i64..=500).prop_map(LedgerOp::Add),
        (1i64..=500).prop_map(LedgerOp::Deduct),
    ]
}

fn condition_strategy() -> impl Strategy<Value = Condition> {
    prop::sample::select(Condition::ALL.to_vec())
}

fn category_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "electronics",
        "phones",
        "laptops",
        "books",
        "accessories",
        "toys",
        "furniture",
        "unknown-category",
    ])
    .prop_map(str::to_string)
}

fn brand_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of(
        prop::sample::select(vec!["apple", "Gucci", "nike", "acme", "  "]).prop_map(str::to_string),
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: balance never goes negative and moves by exactly the amount
    #[test]
    fn prop_balance_tracks_operations(ops in prop::collection::vec(ledger_op_strategy(), 1..40)) {
        runtime().block_on(async {
            let store = InMemoryStore::new();
            let account = store.add_account("prop").await;
            let wallets = WalletManager::new(Arc::new(store.clone()));
            let mut expected = 0i64;

            for op in ops {
                match op {
                    LedgerOp::Add(amount) => {
                        let wallet = wallets.add(account, amount, "prop add").await.unwrap();
                        expected += amount;
                        assert_eq!(wallet.balance, expected);
                    }
                    LedgerOp::Deduct(amount) => match wallets.deduct(account, amount, "prop deduct").await {
                        Ok(wallet) => {
                            assert!(amount <= expected);
                            expected -= amount;
                            assert_eq!(wallet.balance, expected);
                        }
                        Err(WalletError::InsufficientBalance { available, required }) => {
                            assert!(amount > expected);
                            assert_eq!(available, expected);
                            assert_eq!(required, amount);
                        }
                        Err(e) => panic!("unexpected error: {e}"),
                    },
                }

                let wallet = wallets.get_or_create(account).await.unwrap();
                assert!(wallet.balance >= 0);
                assert_eq!(wallet.balance, expected);
                assert_eq!(
                    wallet.balance,
                    wallet.earned_total - wallet.spent_total - wallet.gifted_total
                );
            }
        });
    }

    /// Property: gifts conserve total karma and log exactly one gift each
    #[test]
    fn prop_gift_conserves_karma(
        funding in 0i64..1_000,
        gifts in prop::collection::vec((any::<bool>(), 1i64..400), 1..20),
    ) {
        runtime().block_on(async {
            let store = InMemoryStore::new();
            let alice = store.add_account("alice").await;
            let bob = store.add_account("bob").await;
            let wallets = WalletManager::new(Arc::new(store.clone()));
            if funding > 0 {
                wallets.add(alice, funding, "seed").await.unwrap();
            }
            let mut successful = 0usize;

            for (to_bob, amount) in gifts {
                let (from, to) = if to_bob { (alice, "bob") } else { (bob, "alice") };
                let before = wallets.get_or_create(from).await.unwrap().balance;
                match wallets.gift(from, to, amount).await {
                    Ok(receipt) => {
                        successful += 1;
                        assert_eq!(receipt.sender.balance, before - amount);
                    }
                    Err(WalletError::InsufficientBalance { .. }) => assert!(before < amount),
                    Err(e) => panic!("unexpected error: {e}"),
                }

                let total = wallets.get_or_create(alice).await.unwrap().balance
                    + wallets.get_or_create(bob).await.unwrap().balance;
                assert_eq!(total, funding);
            }

            let gift_rows = store
                .transactions()
                .await
                .into_iter()
                .filter(|t| t.transaction_type == TransactionType::Gift)
                .count();
            assert_eq!(gift_rows, successful);
        });
    }

    /// Property: valuation is deterministic and never below the floor
    #[test]
    fn prop_valuation_bounded_and_deterministic(
        condition in condition_strategy(),
        category in category_strategy(),
        brand in brand_strategy(),
        demand in -1_000i64..1_000,
    ) {
        let input = ValuationInput {
            condition,
            category,
            brand,
            images: vec![],
        };
        let first = valuate(&input, demand);
        let second = valuate(&input, demand);

        prop_assert!(first.total >= FLOOR_VALUE);
        prop_assert!(first.demand_adjustment.abs() <= 25);
        prop_assert_eq!(first, second);
    }

    /// Property: valuation never increases as condition worsens
    #[test]
    fn prop_better_condition_is_worth_at_least_as_much(
        category in category_strategy(),
        brand in brand_strategy(),
    ) {
        let totals: Vec<i64> = Condition::ALL
            .iter()
            .map(|&condition| {
                valuate(
                    &ValuationInput {
                        condition,
                        category: category.clone(),
                        brand: brand.clone(),
                        images: vec![],
                    },
                    0,
                )
                .total
            })
            .collect();

        for pair in totals.windows(2) {
            prop_assert!(pair[0] >= pair[1], "totals not monotonic: {:?}", totals);
        }
    }
}
