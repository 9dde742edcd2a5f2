//! Production run tests

mod common;

use common::{date, dec, fixture, ACTOR};
use dairy_ledger::repository::LedgerRepository;
use dairy_ledger::services::production::RunProductionInput;
use dairy_ledger::services::{ProductionService, Recipient};
use dairy_ledger::AppError;
use shared::{MovementDirection, Product};

fn run(product: &Product, units: &str, waste: &str) -> RunProductionInput {
    RunProductionInput {
        product_id: product.id,
        units: dec(units),
        waste_litres: dec(waste),
        expiry_date: date(2024, 6, 29),
        notes: None,
        actor: ACTOR.to_string(),
    }
}

#[tokio::test]
async fn test_production_moves_raw_milk_into_finished_goods() {
    let fx = fixture().await;

    let report = ProductionService::new(fx.ctx.clone())
        .run_production(run(&fx.yogurt, "100", "5"))
        .await
        .unwrap();

    assert_eq!(report.raw_required_litres, dec("105"));
    assert_eq!(report.raw_used_litres, dec("110"));
    assert_eq!(report.yield_percent, dec("95.5"));

    assert_eq!(fx.product(&fx.raw_milk).await.current_stock, dec("390"));
    assert_eq!(fx.product(&fx.yogurt).await.current_stock, dec("140"));

    let raw_moves = fx.repo.movements_for_product(fx.raw_milk.id).await.unwrap();
    let draw = raw_moves.last().unwrap();
    assert_eq!(draw.direction, MovementDirection::Out);
    assert_eq!(draw.quantity, dec("110"));
    assert!(draw.reason.starts_with("Production -> 100 Yogurt 500g | Required: "));
    assert!(draw.reason.ends_with("| No notes"));

    let yogurt_moves = fx.repo.movements_for_product(fx.yogurt.id).await.unwrap();
    let receipt = yogurt_moves.last().unwrap();
    assert_eq!(receipt.direction, MovementDirection::In);
    assert_eq!(receipt.quantity, dec("100"));
    assert_eq!(receipt.reason, draw.reason);

    let batches = fx.repo.production_batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].production_date, date(2024, 6, 15));

    let sent = fx.notifier.sent().await;
    let last = sent.last().unwrap();
    assert_eq!(last.recipient, Recipient::Staff);
    assert_eq!(last.message, "New production: 100 Yogurt 500g by clerk.maria");
}

#[tokio::test]
async fn test_notes_are_carried_into_the_reason() {
    let fx = fixture().await;

    ProductionService::new(fx.ctx.clone())
        .run_production(RunProductionInput {
            notes: Some(" vat 3 ".to_string()),
            ..run(&fx.fresh_milk, "20", "0")
        })
        .await
        .unwrap();

    let moves = fx.repo.movements_for_product(fx.fresh_milk.id).await.unwrap();
    assert!(moves.last().unwrap().reason.ends_with("| vat 3"));
    assert_eq!(fx.product(&fx.raw_milk).await.current_stock, dec("480"));
}

#[tokio::test]
async fn test_not_enough_raw_milk() {
    let fx = fixture().await;

    let err = ProductionService::new(fx.ctx.clone())
        .run_production(run(&fx.cheese, "50", "1"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InsufficientStock { .. }));
    assert_eq!(fx.product(&fx.raw_milk).await.current_stock, dec("500"));
    assert_eq!(fx.product(&fx.cheese).await.current_stock, dec("30"));
    assert!(fx.repo.production_batches().await.is_empty());
}

#[tokio::test]
async fn test_expiry_must_leave_minimum_shelf_life() {
    let fx = fixture().await;
    let service = ProductionService::new(fx.ctx.clone());

    let err = service
        .run_production(RunProductionInput {
            expiry_date: date(2024, 6, 21),
            ..run(&fx.yogurt, "10", "0")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "expiry_date"));

    service
        .run_production(RunProductionInput {
            expiry_date: date(2024, 6, 22),
            ..run(&fx.yogurt, "10", "0")
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_raw_milk_is_not_a_production_output() {
    let fx = fixture().await;

    let err = ProductionService::new(fx.ctx.clone())
        .run_production(run(&fx.raw_milk, "10", "0"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "product_id"));
}

#[tokio::test]
async fn test_waste_cannot_exceed_requirement() {
    let fx = fixture().await;

    let err = ProductionService::new(fx.ctx.clone())
        .run_production(run(&fx.fresh_milk, "10", "11"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "waste_litres"));

    let err = ProductionService::new(fx.ctx.clone())
        .run_production(run(&fx.fresh_milk, "0", "0"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "units"));

    assert_eq!(fx.product(&fx.raw_milk).await.current_stock, dec("500"));
    assert_eq!(fx.product(&fx.fresh_milk).await.current_stock, dec("100"));
}
