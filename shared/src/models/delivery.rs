//! Raw milk deliveries

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::{grade_delivery, LabReading, LoyaltyTier, MilkPriceInput, MilkPricing, PriceBreakdown, QualityAssessment};
use crate::error::{EngineError, EngineResult};

/// Whether a delivery was taken into stock
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Accepted,
    Rejected,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Accepted => "accepted",
            DeliveryOutcome::Rejected => "rejected",
        }
    }
}

impl FromStr for DeliveryOutcome {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(DeliveryOutcome::Accepted),
            "rejected" => Ok(DeliveryOutcome::Rejected),
            other => Err(EngineError::validation(
                "outcome",
                format!("unknown delivery outcome '{}'", other),
            )),
        }
    }
}

/// A recorded milk delivery. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilkDelivery {
    pub id: Uuid,
    pub farmer_id: Uuid,
    /// Accepted litres; 0 when rejected
    pub litres: Decimal,
    pub fat_percent: Decimal,
    pub snf_percent: Decimal,
    pub temperature_celsius: Decimal,
    pub quality_score: Decimal,
    pub price_per_litre: Decimal,
    pub total_payment: Decimal,
    pub outcome: DeliveryOutcome,
    pub rejection_reason: Option<String>,
    pub notes: Option<String>,
    pub recorded_by: String,
    pub delivery_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Live-display result of grading and pricing a delivery, without side effects
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryPreview {
    pub accepted: bool,
    pub assessment: QualityAssessment,
    /// Present only for accepted milk
    pub price_breakdown: Option<PriceBreakdown>,
}

/// Grade a reading and, when accepted, price it for a farmer of `tier`
pub fn preview_delivery(
    pricing: &MilkPricing,
    reading: &LabReading,
    tier: LoyaltyTier,
    delivered_previous_day: bool,
) -> EngineResult<DeliveryPreview> {
    let assessment = grade_delivery(reading)?;
    let accepted = assessment.decision.is_accepted();

    let price_breakdown = if accepted {
        Some(pricing.price(&MilkPriceInput {
            litres: reading.litres,
            fat_percent: reading.fat_percent,
            snf_percent: reading.snf_percent,
            tier,
            delivered_previous_day,
        })?)
    } else {
        None
    };

    Ok(DeliveryPreview {
        accepted,
        assessment,
        price_breakdown,
    })
}
