//! Milk collection tests
//!
//! Grading previews, accepted deliveries, rejections and tier upgrades
//! against the in-memory ledger.

mod common;

use common::{date, dec, fixture, today, ACTOR};
use dairy_ledger::repository::LedgerRepository;
use dairy_ledger::services::collection::{CommitDeliveryInput, CommitRejectionInput, GradeDeliveryInput};
use dairy_ledger::services::{CollectionService, LedgerContext, Recipient};
use dairy_ledger::AppError;
use rust_decimal::Decimal;
use shared::{DeliveryOutcome, LabReading, LoyaltyTier, MovementDirection};
use uuid::Uuid;

fn reading(litres: &str, fat: &str, snf: &str, temp: &str) -> LabReading {
    LabReading {
        litres: dec(litres),
        fat_percent: dec(fat),
        snf_percent: dec(snf),
        temperature_celsius: dec(temp),
    }
}

fn delivery(farmer_id: Uuid, reading: LabReading) -> CommitDeliveryInput {
    CommitDeliveryInput {
        farmer_id,
        reading,
        notes: None,
        actor: ACTOR.to_string(),
    }
}

async fn deliver(ctx: &LedgerContext, farmer_id: Uuid, litres: &str) {
    CollectionService::new(ctx.clone())
        .commit_delivery(delivery(farmer_id, reading(litres, "3.5", "8.0", "8")))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_grade_preview_uses_farmer_history() {
    let fx = fixture().await;
    let farmer = fx.farmer(LoyaltyTier::Gold).await;
    deliver(&fx.on(date(2024, 6, 14)), farmer.id, "10").await;

    let preview = CollectionService::new(fx.ctx.clone())
        .grade_delivery(GradeDeliveryInput {
            farmer_id: Some(farmer.id),
            reading: reading("200", "4.2", "9.0", "4"),
        })
        .await
        .unwrap();

    let price = preview.price_breakdown.unwrap();
    assert_eq!(price.loyalty_bonus, dec("5"));
    assert_eq!(price.consistency_bonus, dec("2"));
    assert_eq!(price.price_per_litre, dec("105"));
    assert_eq!(price.total_payment, dec("21000"));
    // Nothing recorded by a preview
    assert_eq!(fx.repo.deliveries_for_farmer(farmer.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_grade_preview_without_farmer_prices_as_bronze() {
    let fx = fixture().await;
    let preview = CollectionService::new(fx.ctx.clone())
        .grade_delivery(GradeDeliveryInput {
            farmer_id: None,
            reading: reading("40", "3.2", "8.0", "12"),
        })
        .await
        .unwrap();

    assert!(preview.accepted);
    let price = preview.price_breakdown.unwrap();
    assert_eq!(price.price_per_litre, dec("80"));
    assert_eq!(price.total_payment, dec("3200"));
}

#[tokio::test]
async fn test_accepted_delivery_updates_stock_and_movements() {
    let fx = fixture().await;
    let farmer = fx.farmer(LoyaltyTier::Bronze).await;

    let receipt = CollectionService::new(fx.ctx.clone())
        .commit_delivery(CommitDeliveryInput {
            notes: Some("  morning route ".to_string()),
            ..delivery(farmer.id, reading("120", "4.0", "8.8", "5"))
        })
        .await
        .unwrap();

    // 80 + 5 + 3 + 3 (volume) = 91
    assert_eq!(receipt.price.price_per_litre, dec("91"));
    assert_eq!(receipt.payment, dec("10920"));
    assert_eq!(receipt.new_tier, None);

    let raw = fx.product(&fx.raw_milk).await;
    assert_eq!(raw.current_stock, dec("620"));

    let movements = fx.repo.movements_for_product(raw.id).await.unwrap();
    let last = movements.last().unwrap();
    assert_eq!(last.direction, MovementDirection::In);
    assert_eq!(last.quantity, dec("120"));
    assert_eq!(last.reason, "Collection from Juan Dela Cruz | 120.0L | Bonus ₱1320.00");

    let stored = fx.repo.deliveries_for_farmer(farmer.id).await.unwrap();
    assert_eq!(stored[0].outcome, DeliveryOutcome::Accepted);
    assert_eq!(stored[0].notes.as_deref(), Some("morning route"));

    let farmer = fx.repo.get_farmer(farmer.id).await.unwrap();
    assert_eq!(farmer.bonus_earned, dec("1320"));

    let sent = fx.notifier.sent().await;
    let last = sent.last().unwrap();
    assert_eq!(last.recipient, Recipient::Farmer(farmer.id));
    assert_eq!(last.message, "New collection: 120.0L -> ₱10920.00");
}

#[tokio::test]
async fn test_failing_reading_cannot_be_committed_as_accepted() {
    let fx = fixture().await;
    let farmer = fx.farmer(LoyaltyTier::Bronze).await;

    let err = CollectionService::new(fx.ctx.clone())
        .commit_delivery(delivery(farmer.id, reading("100", "2.9", "8.0", "5")))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation { .. }));
    assert_eq!(fx.product(&fx.raw_milk).await.current_stock, dec("500"));
    assert!(fx.repo.deliveries_for_farmer(farmer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_zero_litres_is_not_a_delivery() {
    let fx = fixture().await;
    let farmer = fx.farmer(LoyaltyTier::Bronze).await;

    let err = CollectionService::new(fx.ctx.clone())
        .commit_delivery(delivery(farmer.id, reading("0", "4.0", "9.0", "5")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "litres"));
}

#[tokio::test]
async fn test_out_of_range_reading_is_rejected_as_invalid() {
    let fx = fixture().await;
    let farmer = fx.farmer(LoyaltyTier::Bronze).await;

    let err = CollectionService::new(fx.ctx.clone())
        .commit_delivery(delivery(farmer.id, reading("100", "11", "9.0", "5")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "fat_percent"));
}

#[tokio::test]
async fn test_unknown_farmer_is_not_found() {
    let fx = fixture().await;
    let err = CollectionService::new(fx.ctx.clone())
        .commit_delivery(delivery(Uuid::new_v4(), reading("100", "4.0", "9.0", "5")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_rejection_records_score_without_stock_or_payment() {
    let fx = fixture().await;
    let farmer = fx.farmer(LoyaltyTier::Silver).await;

    let receipt = CollectionService::new(fx.ctx.clone())
        .commit_rejection(CommitRejectionInput {
            farmer_id: farmer.id,
            litres: dec("60"),
            fat_percent: dec("2.8"),
            snf_percent: dec("8.0"),
            temperature_celsius: dec("18"),
            reason: "Sour smell, warm on arrival".to_string(),
            actor: ACTOR.to_string(),
        })
        .await
        .unwrap();

    // 28 + 26.67 + 0 + 10
    assert_eq!(receipt.quality_score, dec("64.67"));
    assert_eq!(fx.product(&fx.raw_milk).await.current_stock, dec("500"));

    let stored = fx.repo.deliveries_for_farmer(farmer.id).await.unwrap();
    assert_eq!(stored[0].outcome, DeliveryOutcome::Rejected);
    assert_eq!(stored[0].litres, Decimal::ZERO);
    assert_eq!(stored[0].total_payment, Decimal::ZERO);
    assert_eq!(stored[0].rejection_reason.as_deref(), Some("Sour smell, warm on arrival"));

    let farmer_after = fx.repo.get_farmer(farmer.id).await.unwrap();
    assert_eq!(farmer_after.version, farmer.version);

    let sent = fx.notifier.sent().await;
    assert_eq!(
        sent.last().unwrap().message,
        "Your delivery today was rejected: Sour smell, warm on arrival"
    );
}

#[tokio::test]
async fn test_rejection_requires_reason() {
    let fx = fixture().await;
    let farmer = fx.farmer(LoyaltyTier::Bronze).await;

    let err = CollectionService::new(fx.ctx.clone())
        .commit_rejection(CommitRejectionInput {
            farmer_id: farmer.id,
            litres: Decimal::ZERO,
            fat_percent: dec("2.5"),
            snf_percent: dec("7.0"),
            temperature_celsius: dec("20"),
            reason: "   ".to_string(),
            actor: ACTOR.to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "reason"));
    assert!(fx.repo.deliveries_for_farmer(farmer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rejection_yesterday_still_earns_consistency_bonus() {
    let fx = fixture().await;
    let farmer = fx.farmer(LoyaltyTier::Bronze).await;

    CollectionService::new(fx.on(date(2024, 6, 14)))
        .commit_rejection(CommitRejectionInput {
            farmer_id: farmer.id,
            litres: dec("30"),
            fat_percent: dec("2.5"),
            snf_percent: dec("8.0"),
            temperature_celsius: dec("5"),
            reason: "Low fat".to_string(),
            actor: ACTOR.to_string(),
        })
        .await
        .unwrap();

    let receipt = CollectionService::new(fx.ctx.clone())
        .commit_delivery(delivery(farmer.id, reading("10", "3.5", "8.0", "5")))
        .await
        .unwrap();
    assert_eq!(receipt.price.consistency_bonus, dec("2"));
}

#[tokio::test]
async fn test_delivery_two_days_ago_earns_no_consistency_bonus() {
    let fx = fixture().await;
    let farmer = fx.farmer(LoyaltyTier::Bronze).await;
    deliver(&fx.on(date(2024, 6, 13)), farmer.id, "10").await;

    let receipt = CollectionService::new(fx.ctx.clone())
        .commit_delivery(delivery(farmer.id, reading("10", "3.5", "8.0", "5")))
        .await
        .unwrap();
    assert_eq!(receipt.price.consistency_bonus, Decimal::ZERO);
}

#[tokio::test]
async fn test_tier_upgrades_exactly_at_threshold() {
    let fx = fixture().await;
    let farmer = fx.farmer(LoyaltyTier::Bronze).await;
    deliver(&fx.on(date(2024, 6, 3)), farmer.id, "1000").await;
    // Last month's volume does not count
    deliver(&fx.on(date(2024, 5, 31)), farmer.id, "900").await;

    let service = CollectionService::new(fx.ctx.clone());
    let receipt = service
        .commit_delivery(delivery(farmer.id, reading("499", "3.5", "8.0", "8")))
        .await
        .unwrap();
    assert_eq!(receipt.new_tier, None);
    assert_eq!(receipt.month_to_date_litres, dec("1499"));

    let receipt = service
        .commit_delivery(delivery(farmer.id, reading("1", "3.5", "8.0", "8")))
        .await
        .unwrap();
    assert_eq!(receipt.new_tier, Some(LoyaltyTier::Silver));
    assert_eq!(
        fx.repo.get_farmer(farmer.id).await.unwrap().loyalty_tier,
        LoyaltyTier::Silver
    );

    // Already Silver: no further upgrade below 3000
    let receipt = service
        .commit_delivery(delivery(farmer.id, reading("1", "3.5", "8.0", "8")))
        .await
        .unwrap();
    assert_eq!(receipt.new_tier, None);
}

#[tokio::test]
async fn test_large_delivery_moves_one_tier_only() {
    let fx = fixture().await;
    let farmer = fx.farmer(LoyaltyTier::Bronze).await;

    let receipt = CollectionService::new(fx.ctx.clone())
        .commit_delivery(delivery(farmer.id, reading("6000", "3.5", "8.0", "8")))
        .await
        .unwrap();

    assert_eq!(receipt.new_tier, Some(LoyaltyTier::Silver));
    // Priced on the tier held before the delivery
    assert_eq!(receipt.price.loyalty_bonus, Decimal::ZERO);
}

#[tokio::test]
async fn test_month_summary_recomputes_from_deliveries() {
    let fx = fixture().await;
    let farmer = fx.farmer(LoyaltyTier::Silver).await;
    deliver(&fx.on(date(2024, 6, 1)), farmer.id, "1000").await;
    deliver(&fx.on(date(2024, 6, 2)), farmer.id, "500").await;
    deliver(&fx.on(date(2024, 5, 20)), farmer.id, "700").await;

    let summary = CollectionService::new(fx.ctx.clone())
        .farmer_month_summary(farmer.id)
        .await
        .unwrap();

    assert_eq!(summary.month.start, date(2024, 6, 1));
    assert_eq!(summary.month.end, today());
    assert_eq!(summary.litres, dec("1500"));
    assert_eq!(summary.deliveries, 2);
    assert_eq!(summary.tier.next_tier, Some(LoyaltyTier::Gold));
    assert_eq!(summary.tier.progress, dec("0.5"));
}

#[tokio::test]
async fn test_oversized_delivery_is_refused_without_side_effects() {
    let fx = fixture().await;
    let farmer = fx.farmer(LoyaltyTier::Gold).await;
    let mut huge = reading("1", "4.2", "9.0", "4");
    huge.litres = Decimal::from_i128_with_scale(10_i128.pow(27), 0);

    let err = CollectionService::new(fx.ctx.clone())
        .commit_delivery(delivery(farmer.id, huge))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "litres"));
    assert_eq!(fx.product(&fx.raw_milk).await.current_stock, dec("500"));
    assert!(fx.repo.deliveries_for_farmer(farmer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_readings_are_limited_to_two_decimal_places() {
    let fx = fixture().await;
    let farmer = fx.farmer(LoyaltyTier::Bronze).await;
    let service = CollectionService::new(fx.ctx.clone());

    let err = service
        .commit_delivery(delivery(farmer.id, reading("100", "4.195", "9.0", "5")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "fat_percent"));

    let receipt = service
        .commit_delivery(delivery(farmer.id, reading("100", "4.190", "9.0", "5")))
        .await
        .unwrap();
    // 80 + 5 (fat) + 5 (snf) + 3 (volume)
    assert_eq!(receipt.price.price_per_litre, dec("93"));
}
