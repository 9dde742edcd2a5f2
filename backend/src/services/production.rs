//! Production runs converting raw milk into finished goods

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    normalize_optional_text, plan_production, production_reason, validate_expiry, validate_required_text,
    InventoryMovement, MovementDirection, ProductCategory, ProductionBatch,
};
use uuid::Uuid;

use super::ledger::LedgerContext;
use super::notification::{Notification, Recipient};
use crate::error::{AppError, AppResult};
use crate::repository::{ProductionCommit, StockChange};

/// Production service
#[derive(Clone)]
pub struct ProductionService {
    ctx: LedgerContext,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunProductionInput {
    pub product_id: Uuid,
    pub units: Decimal,
    #[serde(default)]
    pub waste_litres: Decimal,
    pub expiry_date: NaiveDate,
    pub notes: Option<String>,
    pub actor: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductionReport {
    pub batch_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub units_produced: Decimal,
    pub raw_required_litres: Decimal,
    pub waste_litres: Decimal,
    pub raw_used_litres: Decimal,
    pub yield_percent: Decimal,
    pub expiry_date: NaiveDate,
}

impl ProductionService {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Draw raw milk, receive finished goods and record the batch in one commit
    pub async fn run_production(&self, input: RunProductionInput) -> AppResult<ProductionReport> {
        let report = self
            .ctx
            .retry_on_conflict("run_production", || self.try_run_production(&input))
            .await?;

        self.ctx
            .notify(Notification::new(
                Recipient::Staff,
                format!(
                    "New production: {} {} by {}",
                    report.units_produced.normalize(),
                    report.product_name,
                    input.actor
                ),
                self.ctx.clock.now(),
            ))
            .await;

        Ok(report)
    }

    async fn try_run_production(&self, input: &RunProductionInput) -> AppResult<ProductionReport> {
        validate_required_text("actor", &input.actor)?;
        let product = self.ctx.repo.get_product(input.product_id).await?;
        if product.category == ProductCategory::RawMilk {
            return Err(AppError::validation("product_id", "raw milk cannot be a production output"));
        }

        let settings = &self.ctx.config.production;
        let plan = plan_production(
            input.units,
            settings.litres_per_unit_for(&product.name),
            input.waste_litres,
        )?;
        let today = self.ctx.clock.today();
        validate_expiry(today, input.expiry_date, settings.minimum_shelf_life_days)?;

        let raw_milk = self.ctx.repo.raw_milk_product().await?;
        if !raw_milk.has_stock_for(plan.raw_used_litres) {
            return Err(AppError::InsufficientStock {
                product: raw_milk.name,
                requested: plan.raw_used_litres,
                available: raw_milk.current_stock,
            });
        }

        let notes = normalize_optional_text(input.notes.as_deref());
        let reason = production_reason(&plan, &product.name, notes.as_deref());
        let now = self.ctx.clock.now();

        let batch = ProductionBatch {
            id: Uuid::new_v4(),
            product_id: product.id,
            units_produced: plan.units,
            raw_required_litres: plan.raw_required_litres,
            waste_litres: plan.waste_litres,
            raw_used_litres: plan.raw_used_litres,
            yield_percent: plan.yield_percent,
            production_date: today,
            expiry_date: input.expiry_date,
            notes,
            recorded_by: input.actor.clone(),
            created_at: now,
        };

        self.ctx
            .repo
            .commit_production(&ProductionCommit {
                batch: batch.clone(),
                raw_milk: StockChange::new(
                    &raw_milk,
                    InventoryMovement::new(
                        raw_milk.id,
                        MovementDirection::Out,
                        plan.raw_used_litres,
                        reason.clone(),
                        &input.actor,
                        now,
                    ),
                ),
                finished_goods: StockChange::new(
                    &product,
                    InventoryMovement::new(product.id, MovementDirection::In, plan.units, reason, &input.actor, now),
                ),
            })
            .await?;

        tracing::info!(
            batch_id = %batch.id,
            product = %product.name,
            units = %plan.units,
            raw_used = %plan.raw_used_litres,
            yield_percent = %plan.yield_percent,
            "Production run recorded"
        );

        Ok(ProductionReport {
            batch_id: batch.id,
            product_id: product.id,
            product_name: product.name,
            units_produced: plan.units,
            raw_required_litres: plan.raw_required_litres,
            waste_litres: plan.waste_litres,
            raw_used_litres: plan.raw_used_litres,
            yield_percent: plan.yield_percent,
            expiry_date: batch.expiry_date,
        })
    }
}
