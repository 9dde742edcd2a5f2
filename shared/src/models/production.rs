//! Conversion of raw milk into finished goods

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::money::{checked_add, checked_mul};
use crate::validation::{validate_non_negative, validate_positive};

/// Shortest shelf life accepted for a finished batch
pub const MIN_SHELF_LIFE_DAYS: i64 = 7;

/// Raw milk consumed by a production run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProductionPlan {
    pub units: Decimal,
    pub litres_per_unit: Decimal,
    pub raw_required_litres: Decimal,
    pub waste_litres: Decimal,
    /// Required plus waste; the amount drawn from raw milk stock
    pub raw_used_litres: Decimal,
    pub yield_percent: Decimal,
}

/// Yield of a run, one decimal place. A run that uses nothing yields 100%.
pub fn yield_percent(raw_required: Decimal, raw_used: Decimal) -> Decimal {
    if raw_used.is_zero() {
        return Decimal::ONE_HUNDRED;
    }
    (raw_required / raw_used * Decimal::ONE_HUNDRED).round_dp(1)
}

pub fn plan_production(units: Decimal, litres_per_unit: Decimal, waste_litres: Decimal) -> EngineResult<ProductionPlan> {
    validate_positive("units", units)?;
    validate_positive("litres_per_unit", litres_per_unit)?;
    validate_non_negative("waste_litres", waste_litres)?;

    let raw_required_litres = checked_mul("units", units, litres_per_unit)?.round_dp(2);
    if waste_litres > raw_required_litres {
        return Err(EngineError::validation(
            "waste_litres",
            format!("cannot exceed the {} L required", raw_required_litres),
        ));
    }
    let raw_used_litres = checked_add("waste_litres", raw_required_litres, waste_litres)?;

    Ok(ProductionPlan {
        units,
        litres_per_unit,
        raw_required_litres,
        waste_litres,
        raw_used_litres,
        yield_percent: yield_percent(raw_required_litres, raw_used_litres),
    })
}

pub fn validate_expiry(production_date: NaiveDate, expiry_date: NaiveDate, min_shelf_life_days: i64) -> EngineResult<()> {
    if (expiry_date - production_date).num_days() < min_shelf_life_days {
        return Err(EngineError::validation(
            "expiry_date",
            format!("must be at least {} days after production", min_shelf_life_days),
        ));
    }
    Ok(())
}

/// Movement reason written against the raw milk draw and finished goods receipt
pub fn production_reason(plan: &ProductionPlan, product_name: &str, notes: Option<&str>) -> String {
    format!(
        "Production -> {} {} | Required: {}L | Waste: {}L | {}",
        plan.units.normalize(),
        product_name,
        plan.raw_required_litres,
        plan.waste_litres,
        notes.unwrap_or("No notes")
    )
}

/// A recorded production run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionBatch {
    pub id: Uuid,
    pub product_id: Uuid,
    pub units_produced: Decimal,
    pub raw_required_litres: Decimal,
    pub waste_litres: Decimal,
    pub raw_used_litres: Decimal,
    pub yield_percent: Decimal,
    pub production_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub notes: Option<String>,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}
