//! Inventory movement audit trail

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::EngineError;

/// Movement direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementDirection {
    In,
    Out,
}

impl MovementDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::In => "IN",
            MovementDirection::Out => "OUT",
        }
    }
}

impl FromStr for MovementDirection {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(MovementDirection::In),
            "OUT" => Ok(MovementDirection::Out),
            other => Err(EngineError::validation(
                "direction",
                format!("unknown movement direction '{}'", other),
            )),
        }
    }
}

/// A single signed change to a product's stock. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub direction: MovementDirection,
    pub quantity: Decimal,
    pub reason: String,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}

impl InventoryMovement {
    pub fn new(
        product_id: Uuid,
        direction: MovementDirection,
        quantity: Decimal,
        reason: impl Into<String>,
        recorded_by: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            direction,
            quantity,
            reason: reason.into(),
            recorded_by: recorded_by.into(),
            created_at,
        }
    }

    /// Quantity with the sign of its direction
    pub fn signed_quantity(&self) -> Decimal {
        match self.direction {
            MovementDirection::In => self.quantity,
            MovementDirection::Out => -self.quantity,
        }
    }
}

/// Net stock implied by a product's movements
pub fn stock_from_movements<'a>(movements: impl IntoIterator<Item = &'a InventoryMovement>) -> Decimal {
    movements
        .into_iter()
        .map(InventoryMovement::signed_quantity)
        .sum()
}

/// Comparison of a product's stored stock against its movement history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockReconciliation {
    pub product_id: Uuid,
    pub product_name: String,
    pub recorded_stock: Decimal,
    pub movement_total: Decimal,
    pub movement_count: usize,
    pub balanced: bool,
}

impl StockReconciliation {
    pub fn new(product_id: Uuid, product_name: String, recorded_stock: Decimal, movements: &[InventoryMovement]) -> Self {
        let movement_total = stock_from_movements(movements);
        Self {
            product_id,
            product_name,
            recorded_stock,
            movement_total,
            movement_count: movements.len(),
            balanced: movement_total == recorded_stock,
        }
    }
}
