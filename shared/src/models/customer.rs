//! Registered buyers and their discount policies

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::EngineError;

/// Registered buyer classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CustomerType {
    Reseller,
    Distributor,
    InstitutionalBuyer,
}

impl CustomerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerType::Reseller => "reseller",
            CustomerType::Distributor => "distributor",
            CustomerType::InstitutionalBuyer => "institutional_buyer",
        }
    }
}

impl FromStr for CustomerType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reseller" => Ok(CustomerType::Reseller),
            "distributor" => Ok(CustomerType::Distributor),
            "institutional_buyer" => Ok(CustomerType::InstitutionalBuyer),
            other => Err(EngineError::validation(
                "customer_type",
                format!("unknown customer type '{}'", other),
            )),
        }
    }
}

/// Per-customer discount on the standard retail price
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DiscountPolicy {
    /// Percent off the standard price
    Percentage(Decimal),
    /// Fixed amount off each unit, never below zero
    Fixed(Decimal),
}

impl Default for DiscountPolicy {
    fn default() -> Self {
        DiscountPolicy::Percentage(Decimal::ZERO)
    }
}

impl DiscountPolicy {
    pub fn apply(&self, price: Decimal) -> Decimal {
        match *self {
            DiscountPolicy::Percentage(percent) => {
                price * (Decimal::ONE - percent / Decimal::ONE_HUNDRED)
            }
            DiscountPolicy::Fixed(amount) => (price - amount).max(Decimal::ZERO),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DiscountPolicy::Percentage(_) => "percentage",
            DiscountPolicy::Fixed(_) => "fixed",
        }
    }

    pub fn value(&self) -> Decimal {
        match *self {
            DiscountPolicy::Percentage(v) | DiscountPolicy::Fixed(v) => v,
        }
    }

    pub fn from_parts(kind: &str, value: Decimal) -> Result<Self, EngineError> {
        match kind {
            "percentage" => Ok(DiscountPolicy::Percentage(value)),
            "fixed" => Ok(DiscountPolicy::Fixed(value)),
            other => Err(EngineError::validation(
                "discount_type",
                format!("unknown discount type '{}'", other),
            )),
        }
    }
}

/// A registered buyer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub customer_type: CustomerType,
    pub contact: Option<String>,
    pub discount: DiscountPolicy,
    pub loyalty_points: i64,
    /// Amount owed to the cooperative; never negative
    pub outstanding_balance: Decimal,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(name: impl Into<String>, customer_type: CustomerType, discount: DiscountPolicy) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            customer_type,
            contact: None,
            discount,
            loyalty_points: 0,
            outstanding_balance: Decimal::ZERO,
            version: 0,
            created_at: Utc::now(),
        }
    }

    pub fn profile(&self) -> CustomerProfile {
        CustomerProfile {
            customer_id: self.id,
            discount: self.discount,
            loyalty_points: self.loyalty_points,
        }
    }
}

/// The slice of a registered buyer the cart engine needs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CustomerProfile {
    pub customer_id: Uuid,
    pub discount: DiscountPolicy,
    pub loyalty_points: i64,
}
