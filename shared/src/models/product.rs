//! Product catalog entries

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::EngineError;

/// Product category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    RawMilk,
    FinishedGoods,
    ByProduct,
}

impl ProductCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::RawMilk => "raw_milk",
            ProductCategory::FinishedGoods => "finished_goods",
            ProductCategory::ByProduct => "by_product",
        }
    }
}

impl FromStr for ProductCategory {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw_milk" => Ok(ProductCategory::RawMilk),
            "finished_goods" => Ok(ProductCategory::FinishedGoods),
            "by_product" => Ok(ProductCategory::ByProduct),
            other => Err(EngineError::validation(
                "category",
                format!("unknown product category '{}'", other),
            )),
        }
    }
}

impl std::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductCategory::RawMilk => write!(f, "Raw Milk"),
            ProductCategory::FinishedGoods => write!(f, "Finished Goods"),
            ProductCategory::ByProduct => write!(f, "By-Product"),
        }
    }
}

/// A stocked product. `current_stock` is the shared quantity every
/// collection, sale and production run contends on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: ProductCategory,
    pub unit: String,
    /// Standard retail price
    pub standard_price: Decimal,
    pub current_stock: Decimal,
    pub low_stock_threshold: Decimal,
    /// Optimistic concurrency version, bumped on every stock change
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        category: ProductCategory,
        unit: impl Into<String>,
        standard_price: Decimal,
        low_stock_threshold: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category,
            unit: unit.into(),
            standard_price,
            current_stock: Decimal::ZERO,
            low_stock_threshold,
            version: 0,
            created_at: Utc::now(),
        }
    }

    pub fn has_stock_for(&self, quantity: Decimal) -> bool {
        quantity <= self.current_stock
    }

    /// Sellable product running low but not yet out of stock
    pub fn is_low_stock(&self) -> bool {
        self.category != ProductCategory::RawMilk
            && self.current_stock > Decimal::ZERO
            && self.current_stock <= self.low_stock_threshold
    }
}
