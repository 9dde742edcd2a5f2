//! Promotional rules applied to a priced cart
//!
//! Each rule is evaluated independently against the priced lines and
//! contributes a pure subtraction, so rule order never changes the total.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::PricedLine;
use crate::error::EngineResult;
use crate::money::{checked_add, checked_mul, checked_sum, percent_of, whole_units};

/// A promotion the cart engine knows how to evaluate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromotionRule {
    /// Every `buy_quantity` units of the flagship product earns one free unit,
    /// credited at `free_unit_price` or, when unset, the product's standard price
    BuyQuantityGetOneFree {
        product_name: String,
        buy_quantity: Decimal,
        #[serde(default)]
        free_unit_price: Option<Decimal>,
    },
    /// `discount_percent` off the lines of bundle groups, once the cart spans
    /// at least two distinct groups. A line belongs to the first group whose
    /// name appears in its product name.
    GroupBundle {
        groups: Vec<String>,
        discount_percent: Decimal,
    },
}

/// A promotion that fired for a cart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedPromotion {
    pub code: String,
    pub message: String,
    pub discount: Decimal,
}

impl PromotionRule {
    pub fn code(&self) -> &'static str {
        match self {
            PromotionRule::BuyQuantityGetOneFree { .. } => "buy_quantity_get_one_free",
            PromotionRule::GroupBundle { .. } => "group_bundle",
        }
    }

    /// The promotion earned by `lines`, if any
    pub fn apply(&self, lines: &[PricedLine]) -> EngineResult<Option<AppliedPromotion>> {
        match self {
            PromotionRule::BuyQuantityGetOneFree {
                product_name,
                buy_quantity,
                free_unit_price,
            } => {
                let flagship: Vec<&PricedLine> = lines
                    .iter()
                    .filter(|line| &line.product_name == product_name)
                    .collect();
                let quantity = checked_sum("quantity", flagship.iter().map(|line| line.quantity))?;
                let free_units = whole_units(quantity, *buy_quantity);
                if free_units == 0 {
                    return Ok(None);
                }
                let unit_value = match (free_unit_price, flagship.first()) {
                    (Some(price), _) => *price,
                    (None, Some(line)) => line.standard_price,
                    (None, None) => return Ok(None),
                };
                Ok(Some(AppliedPromotion {
                    code: self.code().to_string(),
                    message: format!(
                        "Buy {} Get 1 Free -> {} free {}",
                        buy_quantity.normalize(),
                        free_units,
                        product_name
                    ),
                    discount: checked_mul("promo_discount", Decimal::from(free_units), unit_value)?,
                }))
            }
            PromotionRule::GroupBundle {
                groups,
                discount_percent,
            } => {
                let mut matched_groups = BTreeSet::new();
                let mut bundle_total = Decimal::ZERO;
                for line in lines {
                    if let Some(group) = groups
                        .iter()
                        .find(|group| line.product_name.contains(group.as_str()))
                    {
                        matched_groups.insert(group.as_str());
                        bundle_total = checked_add("promo_discount", bundle_total, line.line_total)?;
                    }
                }
                if matched_groups.len() < 2 {
                    return Ok(None);
                }
                Ok(Some(AppliedPromotion {
                    code: self.code().to_string(),
                    message: format!(
                        "{} Bundle -> {}% off",
                        groups.join(" + "),
                        discount_percent.normalize()
                    ),
                    discount: percent_of("promo_discount", bundle_total, *discount_percent)?,
                }))
            }
        }
    }
}

/// The cooperative's standing promotions
pub fn default_promotions() -> Vec<PromotionRule> {
    vec![
        PromotionRule::BuyQuantityGetOneFree {
            product_name: "Fresh Milk 1L".to_string(),
            buy_quantity: Decimal::TEN,
            // Free units have always been credited at 50 regardless of the
            // catalog price. Set to `None` to follow the live price instead.
            free_unit_price: Some(Decimal::from(50)),
        },
        PromotionRule::GroupBundle {
            groups: vec!["Yogurt".to_string(), "Cheese".to_string()],
            discount_percent: Decimal::TEN,
        },
    ]
}
