//! Ledger consistency tests: optimistic concurrency, retries and stock
//! reconciliation under arbitrary operation sequences

mod common;

use std::sync::atomic::{AtomicU32, Ordering};

use common::{date, dec, fixture, fixture_with, today, ACTOR};
use dairy_ledger::config::Config;
use dairy_ledger::repository::{LedgerRepository, SaleCommit, StockChange};
use dairy_ledger::services::inventory::RegisterProductInput;
use dairy_ledger::services::production::RunProductionInput;
use dairy_ledger::services::sales::CommitSaleInput;
use dairy_ledger::services::{InventoryService, ProductionService, SalesService};
use dairy_ledger::AppError;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{CartLine, InventoryMovement, MovementDirection, PaymentMethod, ProductCategory, Sale};
use uuid::Uuid;

fn cash_sale(product_id: Uuid, quantity: Decimal) -> CommitSaleInput {
    CommitSaleInput {
        customer_id: None,
        lines: vec![CartLine { product_id, quantity }],
        points_to_redeem: 0,
        payment_method: PaymentMethod::Cash,
        amount_paid: None,
        actor: ACTOR.to_string(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sales_never_oversell() {
    let mut config = Config::for_tests();
    config.ledger.max_commit_attempts = 10;
    let fx = fixture_with(config).await;

    let butter = InventoryService::new(fx.ctx.clone())
        .register_product(RegisterProductInput {
            name: "Butter 250g".to_string(),
            category: ProductCategory::FinishedGoods,
            unit: "Pack".to_string(),
            standard_price: dec("95"),
            low_stock_threshold: dec("2"),
            initial_stock: dec("5"),
            actor: ACTOR.to_string(),
        })
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let service = SalesService::new(fx.ctx.clone());
        let product_id = butter.id;
        handles.push(tokio::spawn(async move {
            service.commit_sale(cash_sale(product_id, Decimal::ONE)).await
        }));
    }

    let mut sold = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => sold += 1,
            Err(AppError::InsufficientStock { .. }) => refused += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(sold, 5);
    assert_eq!(refused, 15);
    assert_eq!(fx.product(&butter).await.current_stock, Decimal::ZERO);

    let reconciliation = InventoryService::new(fx.ctx.clone())
        .reconcile_product(butter.id)
        .await
        .unwrap();
    assert!(reconciliation.balanced);
    // Opening stock plus five sales
    assert_eq!(reconciliation.movement_count, 6);
}

#[tokio::test]
async fn test_stale_commit_writes_nothing() {
    let fx = fixture().await;
    let milk = fx.product(&fx.fresh_milk).await;
    let cheese = fx.product(&fx.cheese).await;

    // Someone else sells cheese after we read it
    SalesService::new(fx.ctx.clone())
        .commit_sale(cash_sale(cheese.id, dec("1")))
        .await
        .unwrap();

    let now = fx.ctx.clock.now();
    let movement = |product_id, quantity: &str| {
        InventoryMovement::new(product_id, MovementDirection::Out, dec(quantity), "Sale", ACTOR, now)
    };
    let sale = Sale {
        id: Uuid::new_v4(),
        customer_id: None,
        customer_name: "Walk-in".to_string(),
        subtotal: dec("220"),
        promo_discount: Decimal::ZERO,
        points_discount: Decimal::ZERO,
        vat: dec("26.4"),
        grand_total: dec("246.4"),
        payment_method: PaymentMethod::Cash,
        amount_paid: dec("246.4"),
        points_redeemed: 0,
        points_earned: 0,
        recorded_by: ACTOR.to_string(),
        sale_date: today(),
        created_at: now,
    };

    let err = fx
        .repo
        .commit_sale(&SaleCommit {
            sale,
            lines: Vec::new(),
            stock: vec![
                StockChange::new(&milk, movement(milk.id, "2")),
                StockChange::new(&cheese, movement(cheese.id, "1")),
            ],
            customer: None,
        })
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(fx.product(&fx.fresh_milk).await.current_stock, dec("100"));
    assert_eq!(fx.product(&fx.cheese).await.current_stock, dec("29"));
    assert_eq!(fx.repo.sales().await.len(), 1);
}

#[tokio::test]
async fn test_retry_succeeds_after_conflicts() {
    let fx = fixture().await;
    let attempts = AtomicU32::new(0);

    let result = fx
        .ctx
        .retry_on_conflict("test", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(AppError::ConcurrencyConflict("product".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(result, 3);
}

#[tokio::test]
async fn test_retry_gives_up_after_max_attempts() {
    let fx = fixture().await;
    let attempts = AtomicU32::new(0);

    let err = fx
        .ctx
        .retry_on_conflict("test", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(AppError::ConcurrencyConflict("product".to_string())) }
        })
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(attempts.load(Ordering::SeqCst), fx.ctx.config.ledger.max_commit_attempts);
}

#[tokio::test]
async fn test_retry_does_not_repeat_other_errors() {
    let fx = fixture().await;
    let attempts = AtomicU32::new(0);

    let err = fx
        .ctx
        .retry_on_conflict("test", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(AppError::validation("lines", "cart is empty")) }
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation { .. }));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_low_stock_report() {
    let fx = fixture().await;
    let inventory = InventoryService::new(fx.ctx.clone());
    assert!(inventory.low_stock_products().await.unwrap().is_empty());

    // 100 -> 20 leaves Fresh Milk at its threshold; 30 -> 0 leaves Cheese out of stock
    let sales = SalesService::new(fx.ctx.clone());
    sales.commit_sale(cash_sale(fx.fresh_milk.id, dec("80"))).await.unwrap();
    sales.commit_sale(cash_sale(fx.cheese.id, dec("30"))).await.unwrap();

    let low: Vec<String> = inventory
        .low_stock_products()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(low, vec!["Fresh Milk 1L".to_string()]);
}

#[derive(Debug, Clone)]
enum Operation {
    Sell(u32),
    Produce(u32, u32),
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        (1u32..60).prop_map(Operation::Sell),
        (1u32..200, 0u32..10).prop_map(|(units, waste)| Operation::Produce(units, waste)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn stock_always_matches_movements(operations in prop::collection::vec(operation(), 1..25)) {
        tokio_test::block_on(async {
            let fx = fixture().await;
            let sales = SalesService::new(fx.ctx.clone());
            let production = ProductionService::new(fx.ctx.clone());

            for op in &operations {
                let result = match *op {
                    Operation::Sell(units) => sales
                        .commit_sale(cash_sale(fx.fresh_milk.id, Decimal::from(units)))
                        .await
                        .map(|_| ()),
                    Operation::Produce(units, waste) => production
                        .run_production(RunProductionInput {
                            product_id: fx.fresh_milk.id,
                            units: Decimal::from(units),
                            waste_litres: Decimal::from(waste),
                            expiry_date: date(2024, 6, 29),
                            notes: None,
                            actor: ACTOR.to_string(),
                        })
                        .await
                        .map(|_| ()),
                };
                if let Err(err) = result {
                    assert!(
                        matches!(err, AppError::InsufficientStock { .. } | AppError::Validation { .. }),
                        "unexpected error: {err}"
                    );
                }
            }

            let inventory = InventoryService::new(fx.ctx.clone());
            for product in inventory.list_products().await.unwrap() {
                assert!(product.current_stock >= Decimal::ZERO);
                let reconciliation = inventory.reconcile_product(product.id).await.unwrap();
                assert!(reconciliation.balanced, "{} does not reconcile", product.name);
            }
        });
    }
}
