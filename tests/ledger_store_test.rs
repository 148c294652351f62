//! Integration tests for the SQLite ledger store.
//!
//! Covers the stock invariant, atomic pairing of stock mutation and ledger
//! append, uniqueness conflicts, and the audit read paths.

mod common;

use std::sync::Arc;

use common::*;
use stock_ledger::domain::{
    MovementDirection, NewProduct, ProductFilter, ProductId, ProductUpdate,
};
use stock_ledger::{LedgerError, LedgerStore};

#[tokio::test]
async fn entry_increases_stock_and_appends_row() {
    let (_dir, store) = temp_store().await;
    let product_id = seed_product(&store, "Power Saw", 0).await;

    let applied = store
        .apply_entry(movement(product_id, 5, MovementDirection::Entry))
        .await
        .unwrap();

    assert_eq!(applied.product.current_stock, 5);
    assert_eq!(applied.entry.direction, MovementDirection::Entry);
    assert_eq!(applied.entry.quantity, 5);
    assert!(applied.entry.proof_reference.is_none());

    let entries = store.entries_by_product(product_id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, applied.entry.id);
}

#[tokio::test]
async fn exit_decreases_stock() {
    let (_dir, store) = temp_store().await;
    let product_id = seed_product(&store, "Hand Drill", 10).await;

    let applied = store
        .apply_exit(movement(product_id, 3, MovementDirection::Exit))
        .await
        .unwrap();

    assert_eq!(applied.product.current_stock, 7);
    assert_eq!(applied.entry.direction, MovementDirection::Exit);
}

#[tokio::test]
async fn exit_at_exact_balance_reaches_zero() {
    let (_dir, store) = temp_store().await;
    let product_id = seed_product(&store, "Ladder", 10).await;

    let applied = store
        .apply_exit(movement(product_id, 10, MovementDirection::Exit))
        .await
        .unwrap();
    assert_eq!(applied.product.current_stock, 0);

    // One past the balance fails and leaves stock untouched.
    let err = store
        .apply_exit(movement(product_id, 1, MovementDirection::Exit))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientStock { available: 0, .. }));

    let product = store.product_by_id(product_id).await.unwrap().unwrap();
    assert_eq!(product.current_stock, 0);
}

#[tokio::test]
async fn exit_beyond_balance_is_rejected_without_side_effects() {
    let (_dir, store) = temp_store().await;
    let product_id = seed_product(&store, "Workbench", 10).await;

    let err = store
        .apply_exit(movement(product_id, 11, MovementDirection::Exit))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientStock {
            requested: 11,
            available: 10,
            ..
        }
    ));

    // No phantom ledger row, no stock change.
    let product = store.product_by_id(product_id).await.unwrap().unwrap();
    assert_eq!(product.current_stock, 10);
    assert!(store.entries_by_product(product_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn movement_on_missing_product_is_not_found() {
    let (_dir, store) = temp_store().await;
    let ghost = ProductId::new();

    let err = store
        .apply_exit(movement(ghost, 3, MovementDirection::Exit))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ProductNotFound(_)));

    let err = store
        .apply_entry(movement(ghost, 3, MovementDirection::Entry))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ProductNotFound(_)));

    assert!(store.list_entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn non_positive_quantities_are_rejected_before_mutation() {
    let (_dir, store) = temp_store().await;
    let product_id = seed_product(&store, "Clamp", 10).await;

    for quantity in [0, -4] {
        let err = store
            .apply_entry(movement(product_id, quantity, MovementDirection::Entry))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidQuantity(_)));

        let err = store
            .apply_exit(movement(product_id, quantity, MovementDirection::Exit))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidQuantity(_)));
    }

    let product = store.product_by_id(product_id).await.unwrap().unwrap();
    assert_eq!(product.current_stock, 10);
    assert!(store.list_entries().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_exits_cannot_oversell() {
    let (_dir, store) = temp_store().await;
    let store = Arc::new(store);
    let product_id = seed_product(store.as_ref(), "Generator", 10).await;

    // Two exits of 6 against a balance of 10: each looks fine in isolation,
    // exactly one may commit.
    let s1 = store.clone();
    let s2 = store.clone();
    let t1 = tokio::spawn(async move {
        s1.apply_exit(movement(product_id, 6, MovementDirection::Exit))
            .await
    });
    let t2 = tokio::spawn(async move {
        s2.apply_exit(movement(product_id, 6, MovementDirection::Exit))
            .await
    });

    let results = [t1.await.unwrap(), t2.await.unwrap()];
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let insufficient = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::InsufficientStock { .. })))
        .count();

    assert_eq!(succeeded, 1);
    assert_eq!(insufficient, 1);

    let product = store.product_by_id(product_id).await.unwrap().unwrap();
    assert_eq!(product.current_stock, 4);

    // Exactly one ledger row exists, matching the one applied delta.
    let entries = store.entries_by_product(product_id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].quantity, 6);
    assert_eq!(entries[0].direction, MovementDirection::Exit);
}

#[tokio::test]
async fn ledger_reflects_commit_order_per_product() {
    let (_dir, store) = temp_store().await;
    let product_id = seed_product(&store, "Sander", 0).await;

    for quantity in [5, 3, 2] {
        store
            .apply_entry(movement(product_id, quantity, MovementDirection::Entry))
            .await
            .unwrap();
    }
    store
        .apply_exit(movement(product_id, 4, MovementDirection::Exit))
        .await
        .unwrap();

    let entries = store.entries_by_product(product_id).await.unwrap();
    let quantities: Vec<i64> = entries.iter().map(|e| e.quantity).collect();
    assert_eq!(quantities, vec![5, 3, 2, 4]);
    assert_eq!(entries[3].direction, MovementDirection::Exit);
}

#[tokio::test]
async fn duplicate_code_and_name_conflict() {
    let (_dir, store) = temp_store().await;

    store
        .create_product(NewProduct {
            code: "TL-001".into(),
            name: "Power Saw".into(),
            category: "Tools".into(),
            current_stock: 0,
        })
        .await
        .unwrap();

    let err = store
        .create_product(NewProduct {
            code: "TL-001".into(),
            name: "Other Name".into(),
            category: "Tools".into(),
            current_stock: 0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));

    // Name uniqueness is case-insensitive after normalization.
    let err = store
        .create_product(
            NewProduct {
                code: "TL-002".into(),
                name: "  POWER   saw ".into(),
                category: "Tools".into(),
                current_stock: 0,
            }
            .normalized(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));
}

#[tokio::test]
async fn product_filters_by_code_and_name() {
    let (_dir, store) = temp_store().await;

    store
        .create_product(NewProduct {
            code: "TL-010".into(),
            name: "Angle Grinder".into(),
            category: "Tools".into(),
            current_stock: 1,
        })
        .await
        .unwrap();
    store
        .create_product(NewProduct {
            code: "TL-011".into(),
            name: "Bench Grinder".into(),
            category: "Tools".into(),
            current_stock: 1,
        })
        .await
        .unwrap();

    let by_code = store
        .list_products(ProductFilter {
            code: Some("TL-010".into()),
            name: None,
        })
        .await
        .unwrap();
    assert_eq!(by_code.len(), 1);
    assert_eq!(by_code[0].name, "Angle Grinder");

    let by_name = store
        .list_products(ProductFilter {
            code: None,
            name: Some("grinder".into()),
        })
        .await
        .unwrap();
    assert_eq!(by_name.len(), 2);

    let all = store.list_products(ProductFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn update_product_rejects_conflicting_stock_fields() {
    let (_dir, store) = temp_store().await;
    let product_id = seed_product(&store, "Router", 5).await;

    let err = store
        .update_product(
            product_id,
            ProductUpdate {
                current_stock: Some(10),
                add_stock: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));

    let updated = store
        .update_product(
            product_id,
            ProductUpdate {
                add_stock: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.current_stock, 8);

    let updated = store
        .update_product(
            product_id,
            ProductUpdate {
                current_stock: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.current_stock, 2);
}

#[tokio::test]
async fn delete_product_with_history_conflicts() {
    let (_dir, store) = temp_store().await;
    let product_id = seed_product(&store, "Compressor", 0).await;

    store
        .apply_entry(movement(product_id, 2, MovementDirection::Entry))
        .await
        .unwrap();

    let err = store.delete_product(product_id).await.unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));

    // A product without history deletes cleanly; a second delete reports
    // that nothing existed.
    let empty_id = seed_product(&store, "Empty Shelf", 0).await;
    assert!(store.delete_product(empty_id).await.unwrap());
    assert!(!store.delete_product(empty_id).await.unwrap());
}

#[tokio::test]
async fn attach_proof_and_list_unanchored() {
    let (_dir, store) = temp_store().await;
    let product_id = seed_product(&store, "Welder", 0).await;

    let first = store
        .apply_entry(movement(product_id, 1, MovementDirection::Entry))
        .await
        .unwrap()
        .entry;
    let second = store
        .apply_entry(movement(product_id, 2, MovementDirection::Entry))
        .await
        .unwrap()
        .entry;

    assert_eq!(store.list_unanchored().await.unwrap().len(), 2);

    store
        .attach_proof(first.id, "deadbeef.bin.ots")
        .await
        .unwrap();

    let pending = store.list_unanchored().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second.id);

    let reloaded = store.entry_by_id(first.id).await.unwrap().unwrap();
    assert_eq!(reloaded.proof_reference.as_deref(), Some("deadbeef.bin.ots"));
}

#[tokio::test]
async fn entries_filter_by_actor() {
    let (_dir, store) = temp_store().await;
    let product_id = seed_product(&store, "Crane", 0).await;

    store
        .apply_entry(movement(product_id, 1, MovementDirection::Entry))
        .await
        .unwrap();

    let mut record = movement(product_id, 2, MovementDirection::Entry);
    record.actor = other_actor();
    store.apply_entry(record).await.unwrap();

    let mine = store
        .entries_by_actor(test_actor().actor_id)
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].user_email, "clerk@example.com");

    let theirs = store
        .entries_by_actor(other_actor().actor_id)
        .await
        .unwrap();
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].user_email, "auditor@example.com");
}

#[tokio::test]
async fn delete_entry_reports_existence() {
    let (_dir, store) = temp_store().await;
    let product_id = seed_product(&store, "Forklift", 0).await;

    let entry = store
        .apply_entry(movement(product_id, 1, MovementDirection::Entry))
        .await
        .unwrap()
        .entry;

    assert!(store.delete_entry(entry.id).await.unwrap());
    assert!(!store.delete_entry(entry.id).await.unwrap());
    assert!(store.entry_by_id(entry.id).await.unwrap().is_none());
}
