//! Dairy farmer master data

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::EngineError;

/// Farmer loyalty level, ordered from lowest to highest
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyTier {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl LoyaltyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoyaltyTier::Bronze => "bronze",
            LoyaltyTier::Silver => "silver",
            LoyaltyTier::Gold => "gold",
            LoyaltyTier::Platinum => "platinum",
        }
    }

    /// The adjacent higher tier, if any
    pub fn next(&self) -> Option<LoyaltyTier> {
        match self {
            LoyaltyTier::Bronze => Some(LoyaltyTier::Silver),
            LoyaltyTier::Silver => Some(LoyaltyTier::Gold),
            LoyaltyTier::Gold => Some(LoyaltyTier::Platinum),
            LoyaltyTier::Platinum => None,
        }
    }

    /// Monthly litres required to be upgraded into this tier
    pub fn monthly_threshold_litres(&self) -> Decimal {
        match self {
            LoyaltyTier::Bronze => Decimal::ZERO,
            LoyaltyTier::Silver => Decimal::from(1500),
            LoyaltyTier::Gold => Decimal::from(3000),
            LoyaltyTier::Platinum => Decimal::from(5000),
        }
    }

    /// Per-litre payment bonus for farmers in this tier
    pub fn loyalty_bonus(&self) -> Decimal {
        match self {
            LoyaltyTier::Bronze => Decimal::ZERO,
            LoyaltyTier::Silver => Decimal::from(2),
            LoyaltyTier::Gold => Decimal::from(5),
            LoyaltyTier::Platinum => Decimal::from(8),
        }
    }
}

impl std::fmt::Display for LoyaltyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoyaltyTier::Bronze => write!(f, "Bronze"),
            LoyaltyTier::Silver => write!(f, "Silver"),
            LoyaltyTier::Gold => write!(f, "Gold"),
            LoyaltyTier::Platinum => write!(f, "Platinum"),
        }
    }
}

impl FromStr for LoyaltyTier {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bronze" => Ok(LoyaltyTier::Bronze),
            "silver" => Ok(LoyaltyTier::Silver),
            "gold" => Ok(LoyaltyTier::Gold),
            "platinum" => Ok(LoyaltyTier::Platinum),
            other => Err(EngineError::validation(
                "loyalty_tier",
                format!("unknown loyalty tier '{}'", other),
            )),
        }
    }
}

/// A registered dairy farmer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Farmer {
    pub id: Uuid,
    pub name: String,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub loyalty_tier: LoyaltyTier,
    /// Cumulative bonus paid on top of the base price
    pub bonus_earned: Decimal,
    /// Optimistic concurrency version, bumped on every write
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Farmer {
    pub fn new(name: impl Into<String>, loyalty_tier: LoyaltyTier) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            contact: None,
            address: None,
            loyalty_tier,
            bonus_earned: Decimal::ZERO,
            version: 0,
            created_at: Utc::now(),
        }
    }
}
