//! Raw milk collection: grading previews, accepted deliveries and rejections

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::money::checked_add;
use shared::{
    evaluate_tier, normalize_optional_text, preview_delivery, previous_day, tier_progress, validate_positive,
    validate_required_text, DateRange, DeliveryOutcome, DeliveryPreview, Farmer, InventoryMovement, LabReading,
    LoyaltyTier, MilkDelivery, MovementDirection, PriceBreakdown, TierProgress,
};
use uuid::Uuid;

use super::ledger::LedgerContext;
use super::notification::{Notification, Recipient};
use crate::error::{AppError, AppResult};
use crate::repository::{DeliveryCommit, FarmerUpdate, StockChange};

/// Milk collection service
#[derive(Clone)]
pub struct CollectionService {
    ctx: LedgerContext,
}

/// Input for a grading preview. With a farmer the preview uses their tier
/// and delivery history; without one it prices as Bronze with no prior day.
#[derive(Debug, Clone, Deserialize)]
pub struct GradeDeliveryInput {
    pub farmer_id: Option<Uuid>,
    #[serde(flatten)]
    pub reading: LabReading,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDeliveryInput {
    pub farmer_id: Uuid,
    #[serde(flatten)]
    pub reading: LabReading,
    pub notes: Option<String>,
    pub actor: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRejectionInput {
    pub farmer_id: Uuid,
    /// Litres offered; only used for the quality score
    #[serde(default)]
    pub litres: Decimal,
    pub fat_percent: Decimal,
    pub snf_percent: Decimal,
    pub temperature_celsius: Decimal,
    pub reason: String,
    pub actor: String,
}

/// Result of an accepted delivery
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReceipt {
    pub delivery_id: Uuid,
    pub farmer_id: Uuid,
    pub litres: Decimal,
    pub quality_score: Decimal,
    pub price: PriceBreakdown,
    pub payment: Decimal,
    pub month_to_date_litres: Decimal,
    /// Present only when this delivery moved the farmer up a tier
    pub new_tier: Option<LoyaltyTier>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectionReceipt {
    pub delivery_id: Uuid,
    pub farmer_id: Uuid,
    pub quality_score: Decimal,
}

/// Month-to-date figures for a farmer
#[derive(Debug, Clone, Serialize)]
pub struct FarmerMonthSummary {
    pub farmer_id: Uuid,
    pub farmer_name: String,
    pub month: DateRange,
    pub litres: Decimal,
    pub payment: Decimal,
    pub deliveries: i64,
    pub bonus_earned: Decimal,
    pub tier: TierProgress,
}

impl CollectionService {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Grade and price a reading without recording anything
    pub async fn grade_delivery(&self, input: GradeDeliveryInput) -> AppResult<DeliveryPreview> {
        let (tier, delivered_previous_day) = match input.farmer_id {
            Some(farmer_id) => {
                let farmer = self.ctx.repo.get_farmer(farmer_id).await?;
                let yesterday = previous_day(self.ctx.clock.today());
                let delivered = self.ctx.repo.farmer_delivered_on(farmer_id, yesterday).await?;
                (farmer.loyalty_tier, delivered)
            }
            None => (LoyaltyTier::default(), false),
        };

        Ok(preview_delivery(
            &self.ctx.config.milk_pricing(),
            &input.reading,
            tier,
            delivered_previous_day,
        )?)
    }

    /// Record an accepted delivery: raw milk stock, movement, farmer tier and bonus
    pub async fn commit_delivery(&self, input: CommitDeliveryInput) -> AppResult<DeliveryReceipt> {
        let receipt = self
            .ctx
            .retry_on_conflict("commit_delivery", || self.try_commit_delivery(&input))
            .await?;

        self.ctx
            .notify(Notification::new(
                Recipient::Farmer(receipt.farmer_id),
                format!("New collection: {:.1}L -> ₱{:.2}", receipt.litres, receipt.payment),
                self.ctx.clock.now(),
            ))
            .await;

        Ok(receipt)
    }

    async fn try_commit_delivery(&self, input: &CommitDeliveryInput) -> AppResult<DeliveryReceipt> {
        let reading = input.reading;
        validate_required_text("actor", &input.actor)?;
        let farmer = self.ctx.repo.get_farmer(input.farmer_id).await?;
        let today = self.ctx.clock.today();
        let delivered_previous_day = self
            .ctx
            .repo
            .farmer_delivered_on(farmer.id, previous_day(today))
            .await?;

        let preview = preview_delivery(
            &self.ctx.config.milk_pricing(),
            &reading,
            farmer.loyalty_tier,
            delivered_previous_day,
        )?;
        let price = match preview.price_breakdown {
            Some(price) => price,
            None => {
                return Err(AppError::validation(
                    "reading",
                    "milk does not meet the acceptance standard; record a rejection instead",
                ))
            }
        };
        validate_positive("litres", reading.litres)?;

        let raw_milk = self.ctx.repo.raw_milk_product().await?;
        let month = self
            .ctx
            .repo
            .farmer_delivery_totals(farmer.id, DateRange::month_to_date(today))
            .await?;
        let evaluation = evaluate_tier(farmer.loyalty_tier, checked_add("litres", month.litres, reading.litres)?);

        let now = self.ctx.clock.now();
        let delivery = MilkDelivery {
            id: Uuid::new_v4(),
            farmer_id: farmer.id,
            litres: reading.litres,
            fat_percent: reading.fat_percent,
            snf_percent: reading.snf_percent,
            temperature_celsius: reading.temperature_celsius,
            quality_score: preview.assessment.quality_score,
            price_per_litre: price.price_per_litre,
            total_payment: price.total_payment,
            outcome: DeliveryOutcome::Accepted,
            rejection_reason: None,
            notes: normalize_optional_text(input.notes.as_deref()),
            recorded_by: input.actor.clone(),
            delivery_date: today,
            created_at: now,
        };
        let movement = InventoryMovement::new(
            raw_milk.id,
            MovementDirection::In,
            reading.litres,
            collection_reason(&farmer, reading.litres, price.total_bonus),
            &input.actor,
            now,
        );

        self.ctx
            .repo
            .commit_delivery(&DeliveryCommit {
                delivery: delivery.clone(),
                stock: Some(StockChange::new(&raw_milk, movement)),
                farmer: Some(FarmerUpdate {
                    farmer_id: farmer.id,
                    expected_version: farmer.version,
                    loyalty_tier: evaluation.current_tier,
                    bonus_earned: checked_add("bonus_earned", farmer.bonus_earned, price.total_bonus)?,
                }),
            })
            .await?;

        tracing::info!(
            delivery_id = %delivery.id,
            farmer_id = %farmer.id,
            litres = %delivery.litres,
            payment = %delivery.total_payment,
            tier = %evaluation.current_tier,
            "Milk delivery recorded"
        );
        if let Some(tier) = evaluation.new_tier() {
            tracing::info!(farmer_id = %farmer.id, from = %farmer.loyalty_tier, to = %tier, "Farmer tier upgraded");
        }

        Ok(DeliveryReceipt {
            delivery_id: delivery.id,
            farmer_id: farmer.id,
            litres: delivery.litres,
            quality_score: delivery.quality_score,
            price,
            payment: delivery.total_payment,
            month_to_date_litres: evaluation.month_to_date_litres,
            new_tier: evaluation.new_tier(),
        })
    }

    /// Record a rejected delivery: no payment, no stock, the farmer is told why
    pub async fn commit_rejection(&self, input: CommitRejectionInput) -> AppResult<RejectionReceipt> {
        validate_required_text("reason", &input.reason)?;
        validate_required_text("actor", &input.actor)?;
        let reason = input.reason.trim().to_string();

        let reading = LabReading {
            litres: input.litres,
            fat_percent: input.fat_percent,
            snf_percent: input.snf_percent,
            temperature_celsius: input.temperature_celsius,
        };
        let assessment = shared::grade_delivery(&reading)?;
        let farmer = self.ctx.repo.get_farmer(input.farmer_id).await?;

        let now = self.ctx.clock.now();
        let delivery = MilkDelivery {
            id: Uuid::new_v4(),
            farmer_id: farmer.id,
            litres: Decimal::ZERO,
            fat_percent: reading.fat_percent,
            snf_percent: reading.snf_percent,
            temperature_celsius: reading.temperature_celsius,
            quality_score: assessment.quality_score,
            price_per_litre: Decimal::ZERO,
            total_payment: Decimal::ZERO,
            outcome: DeliveryOutcome::Rejected,
            rejection_reason: Some(reason.clone()),
            notes: None,
            recorded_by: input.actor.clone(),
            delivery_date: self.ctx.clock.today(),
            created_at: now,
        };

        self.ctx
            .repo
            .commit_delivery(&DeliveryCommit {
                delivery: delivery.clone(),
                stock: None,
                farmer: None,
            })
            .await?;

        tracing::info!(
            delivery_id = %delivery.id,
            farmer_id = %farmer.id,
            score = %delivery.quality_score,
            "Milk delivery rejected"
        );

        self.ctx
            .notify(Notification::new(
                Recipient::Farmer(farmer.id),
                format!("Your delivery today was rejected: {}", reason),
                now,
            ))
            .await;

        Ok(RejectionReceipt {
            delivery_id: delivery.id,
            farmer_id: farmer.id,
            quality_score: delivery.quality_score,
        })
    }

    /// Month-to-date volume, payment and tier progress, recomputed from deliveries
    pub async fn farmer_month_summary(&self, farmer_id: Uuid) -> AppResult<FarmerMonthSummary> {
        let farmer = self.ctx.repo.get_farmer(farmer_id).await?;
        let month = DateRange::month_to_date(self.ctx.clock.today());
        let totals = self.ctx.repo.farmer_delivery_totals(farmer_id, month).await?;

        Ok(FarmerMonthSummary {
            farmer_id,
            farmer_name: farmer.name,
            month,
            litres: totals.litres,
            payment: totals.payment,
            deliveries: totals.deliveries,
            bonus_earned: farmer.bonus_earned,
            tier: tier_progress(farmer.loyalty_tier, totals.litres),
        })
    }

    pub async fn farmer_deliveries(&self, farmer_id: Uuid) -> AppResult<Vec<MilkDelivery>> {
        self.ctx.repo.get_farmer(farmer_id).await?;
        self.ctx.repo.deliveries_for_farmer(farmer_id).await
    }
}

fn collection_reason(farmer: &Farmer, litres: Decimal, total_bonus: Decimal) -> String {
    format!(
        "Collection from {} | {:.1}L | Bonus ₱{:.2}",
        farmer.name, litres, total_bonus
    )
}
