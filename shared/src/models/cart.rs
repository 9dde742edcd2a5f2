//! Point-of-sale cart pricing
//!
//! Pipeline: discounted line prices -> subtotal -> promotions -> loyalty
//! point redemption -> VAT on the post-discount base -> grand total.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{default_promotions, AppliedPromotion, CustomerProfile, Product, PromotionRule};
use crate::error::{EngineError, EngineResult};
use crate::money::{checked_add, checked_mul, checked_sum, percent_of, round_currency, whole_units};

/// Requested quantity of a product
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

/// A cart line priced for a specific buyer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: Decimal,
    pub standard_price: Decimal,
    /// Price actually charged per unit after the buyer's discount
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Loyalty point redemption and earning rules
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PointsPolicy {
    /// Points are redeemed in blocks of this size; also the minimum balance
    pub points_per_block: i64,
    pub block_value: Decimal,
    /// One point is earned per this much of the grand total
    pub earning_divisor: Decimal,
}

impl Default for PointsPolicy {
    fn default() -> Self {
        Self {
            points_per_block: 100,
            block_value: Decimal::from(50),
            earning_divisor: Decimal::TEN,
        }
    }
}

impl PointsPolicy {
    /// Points actually redeemed and their currency value. Redemption is
    /// limited to whole blocks, the points on hand, and what the remaining
    /// amount can absorb.
    pub fn redeem(&self, points_on_hand: i64, points_requested: i64, spendable: Decimal) -> (i64, Decimal) {
        if self.points_per_block <= 0 || points_on_hand < self.points_per_block {
            return (0, Decimal::ZERO);
        }
        let blocks = (points_requested / self.points_per_block)
            .min(points_on_hand / self.points_per_block)
            .min(whole_units(spendable, self.block_value))
            .max(0);
        (blocks * self.points_per_block, self.block_value * Decimal::from(blocks))
    }

    pub fn earned(&self, grand_total: Decimal) -> i64 {
        whole_units(grand_total, self.earning_divisor)
    }
}

/// Everything that shapes a cart total besides the catalog and the buyer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartPricingPolicy {
    pub vat_percent: Decimal,
    pub points: PointsPolicy,
    pub promotions: Vec<PromotionRule>,
}

impl Default for CartPricingPolicy {
    fn default() -> Self {
        Self {
            vat_percent: Decimal::from(12),
            points: PointsPolicy::default(),
            promotions: default_promotions(),
        }
    }
}

/// Priced cart, ready for display or commit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartQuote {
    pub lines: Vec<PricedLine>,
    pub subtotal: Decimal,
    pub promotions: Vec<AppliedPromotion>,
    pub promo_discount: Decimal,
    pub points_redeemed: i64,
    pub points_discount: Decimal,
    /// Subtotal less promotions and points; the VAT base
    pub taxable_amount: Decimal,
    pub vat: Decimal,
    pub grand_total: Decimal,
    /// Points the buyer earns if this cart is committed
    pub points_earned: i64,
}

impl CartQuote {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Combine repeated products into one line, keeping first-seen order
fn merge_lines(lines: &[CartLine]) -> EngineResult<Vec<CartLine>> {
    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity < Decimal::ZERO {
            return Err(EngineError::validation("quantity", "cannot be negative"));
        }
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => existing.quantity = checked_add("quantity", existing.quantity, line.quantity)?,
            None => merged.push(*line),
        }
    }
    Ok(merged)
}

/// Price a cart against the live catalog.
///
/// `buyer` is `None` for walk-in customers, who get no discount and cannot
/// redeem or earn points. Zero-quantity lines are dropped.
pub fn price_cart(
    policy: &CartPricingPolicy,
    catalog: &[Product],
    buyer: Option<&CustomerProfile>,
    lines: &[CartLine],
    points_requested: i64,
) -> EngineResult<CartQuote> {
    if points_requested < 0 {
        return Err(EngineError::validation("points_to_redeem", "cannot be negative"));
    }
    if buyer.is_none() && points_requested > 0 {
        return Err(EngineError::validation(
            "points_to_redeem",
            "only registered buyers can redeem loyalty points",
        ));
    }

    let mut priced = Vec::new();
    for line in merge_lines(lines)? {
        if line.quantity.is_zero() {
            continue;
        }
        let product = catalog
            .iter()
            .find(|p| p.id == line.product_id)
            .ok_or(EngineError::UnknownProduct(line.product_id))?;
        if !product.has_stock_for(line.quantity) {
            return Err(EngineError::InsufficientStock {
                product: product.name.clone(),
                requested: line.quantity,
                available: product.current_stock,
            });
        }

        let unit_price = match buyer {
            Some(profile) => profile.discount.apply(product.standard_price),
            None => product.standard_price,
        };
        priced.push(PricedLine {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity: line.quantity,
            standard_price: product.standard_price,
            unit_price,
            line_total: checked_mul("quantity", line.quantity, unit_price)?,
        });
    }

    let subtotal = checked_sum("subtotal", priced.iter().map(|l| l.line_total))?;

    let mut promotions: Vec<AppliedPromotion> = Vec::new();
    for rule in &policy.promotions {
        if let Some(applied) = rule.apply(&priced)? {
            promotions.push(applied);
        }
    }
    let promo_discount = checked_sum("promo_discount", promotions.iter().map(|p| p.discount))?.min(subtotal);
    let after_promotions = subtotal - promo_discount;

    let (points_redeemed, points_discount) = match buyer {
        Some(profile) => policy
            .points
            .redeem(profile.loyalty_points, points_requested, after_promotions),
        None => (0, Decimal::ZERO),
    };

    let taxable_amount = after_promotions - points_discount;
    let vat = percent_of("vat", taxable_amount, policy.vat_percent)?;
    let grand_total = round_currency(checked_add("grand_total", taxable_amount, vat)?);
    let points_earned = if buyer.is_some() {
        policy.points.earned(grand_total)
    } else {
        0
    };

    Ok(CartQuote {
        lines: priced,
        subtotal,
        promotions,
        promo_discount,
        points_redeemed,
        points_discount,
        taxable_amount,
        vat: round_currency(vat),
        grand_total,
        points_earned,
    })
}
