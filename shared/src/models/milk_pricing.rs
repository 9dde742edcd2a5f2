//! Farmer payment for accepted raw milk
//!
//! Per-litre price = base + quality premium (fat + SNF) + volume bonus +
//! loyalty bonus + consistency bonus. Every component is reported so a
//! payment can be audited and reproduced from its inputs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::LoyaltyTier;
use crate::error::EngineResult;
use crate::money::{checked_add, checked_mul, round_currency};

/// Inputs to the milk pricing engine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MilkPriceInput {
    pub litres: Decimal,
    pub fat_percent: Decimal,
    pub snf_percent: Decimal,
    pub tier: LoyaltyTier,
    /// Whether the farmer has a delivery recorded on the previous calendar day
    pub delivered_previous_day: bool,
}

/// Itemised per-litre price and payment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceBreakdown {
    pub base_price: Decimal,
    pub fat_premium: Decimal,
    pub snf_premium: Decimal,
    pub quality_premium: Decimal,
    pub volume_bonus: Decimal,
    pub loyalty_bonus: Decimal,
    pub consistency_bonus: Decimal,
    pub price_per_litre: Decimal,
    /// litres x (all per-litre bonuses), rounded to 2 dp
    pub total_bonus: Decimal,
    /// litres x price per litre, rounded to 2 dp
    pub total_payment: Decimal,
}

/// Milk pricing engine; only the base price is configurable
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MilkPricing {
    pub base_price: Decimal,
}

impl Default for MilkPricing {
    fn default() -> Self {
        Self {
            base_price: Decimal::from(80),
        }
    }
}

impl MilkPricing {
    pub fn new(base_price: Decimal) -> Self {
        Self { base_price }
    }

    pub fn fat_premium(fat_percent: Decimal) -> Decimal {
        if fat_percent >= Decimal::new(42, 1) {
            Decimal::from(8)
        } else if fat_percent >= Decimal::from(4) {
            Decimal::from(5)
        } else if fat_percent >= Decimal::new(38, 1) {
            Decimal::from(3)
        } else {
            Decimal::ZERO
        }
    }

    pub fn snf_premium(snf_percent: Decimal) -> Decimal {
        if snf_percent >= Decimal::from(9) {
            Decimal::from(5)
        } else if snf_percent >= Decimal::new(88, 1) {
            Decimal::from(3)
        } else {
            Decimal::ZERO
        }
    }

    pub fn volume_bonus(litres: Decimal) -> Decimal {
        if litres >= Decimal::from(200) {
            Decimal::from(5)
        } else if litres >= Decimal::from(100) {
            Decimal::from(3)
        } else if litres >= Decimal::from(50) {
            Decimal::from(2)
        } else {
            Decimal::ZERO
        }
    }

    pub fn consistency_bonus(delivered_previous_day: bool) -> Decimal {
        if delivered_previous_day {
            Decimal::from(2)
        } else {
            Decimal::ZERO
        }
    }

    /// Fails when `litres` is too large for the payment to be represented
    pub fn price(&self, input: &MilkPriceInput) -> EngineResult<PriceBreakdown> {
        let fat_premium = Self::fat_premium(input.fat_percent);
        let snf_premium = Self::snf_premium(input.snf_percent);
        let quality_premium = fat_premium + snf_premium;
        let volume_bonus = Self::volume_bonus(input.litres);
        let loyalty_bonus = input.tier.loyalty_bonus();
        let consistency_bonus = Self::consistency_bonus(input.delivered_previous_day);

        let bonus_per_litre = quality_premium + volume_bonus + loyalty_bonus + consistency_bonus;
        let price_per_litre = checked_add("base_price", self.base_price, bonus_per_litre)?;

        Ok(PriceBreakdown {
            base_price: self.base_price,
            fat_premium,
            snf_premium,
            quality_premium,
            volume_bonus,
            loyalty_bonus,
            consistency_bonus,
            price_per_litre,
            total_bonus: round_currency(checked_mul("litres", input.litres, bonus_per_litre)?),
            total_payment: round_currency(checked_mul("litres", input.litres, price_per_litre)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(litres: &str, fat: &str, snf: &str, tier: LoyaltyTier, prior: bool) -> MilkPriceInput {
        MilkPriceInput {
            litres: litres.parse().unwrap(),
            fat_percent: fat.parse().unwrap(),
            snf_percent: snf.parse().unwrap(),
            tier,
            delivered_previous_day: prior,
        }
    }

    #[test]
    fn top_quality_gold_with_streak() {
        let breakdown = MilkPricing::default().price(&input("200", "4.2", "9.0", LoyaltyTier::Gold, true)).unwrap();
        assert_eq!(breakdown.quality_premium, Decimal::from(13));
        assert_eq!(breakdown.volume_bonus, Decimal::from(5));
        assert_eq!(breakdown.loyalty_bonus, Decimal::from(5));
        assert_eq!(breakdown.consistency_bonus, Decimal::from(2));
        assert_eq!(breakdown.price_per_litre, Decimal::from(105));
        assert_eq!(breakdown.total_payment, Decimal::from(21000));
        assert_eq!(breakdown.total_bonus, Decimal::from(5000));
    }

    #[test]
    fn premium_tiers_are_exclusive_per_axis() {
        assert_eq!(MilkPricing::fat_premium("4.0".parse().unwrap()), Decimal::from(5));
        assert_eq!(MilkPricing::fat_premium("3.8".parse().unwrap()), Decimal::from(3));
        assert_eq!(MilkPricing::fat_premium("3.79".parse().unwrap()), Decimal::ZERO);
        assert_eq!(MilkPricing::snf_premium("8.8".parse().unwrap()), Decimal::from(3));
        assert_eq!(MilkPricing::snf_premium("8.79".parse().unwrap()), Decimal::ZERO);
    }

    #[test]
    fn volume_bonus_steps() {
        assert_eq!(MilkPricing::volume_bonus(Decimal::from(49)), Decimal::ZERO);
        assert_eq!(MilkPricing::volume_bonus(Decimal::from(50)), Decimal::from(2));
        assert_eq!(MilkPricing::volume_bonus(Decimal::from(100)), Decimal::from(3));
        assert_eq!(MilkPricing::volume_bonus(Decimal::from(200)), Decimal::from(5));
    }

    #[test]
    fn payment_is_rounded_to_cents() {
        // 12.345 L at 83/L = 1024.635, half-to-even gives 1024.64
        let breakdown = MilkPricing::default().price(&input("12.345", "3.8", "8.0", LoyaltyTier::Bronze, false)).unwrap();
        assert_eq!(breakdown.price_per_litre, Decimal::from(83));
        assert_eq!(breakdown.total_payment, "1024.64".parse::<Decimal>().unwrap());
    }

    #[test]
    fn base_price_is_configurable() {
        let breakdown = MilkPricing::new(Decimal::from(90)).price(&input("10", "3.0", "7.5", LoyaltyTier::Bronze, false)).unwrap();
        assert_eq!(breakdown.price_per_litre, Decimal::from(90));
        assert_eq!(breakdown.total_payment, Decimal::from(900));
        assert_eq!(breakdown.total_bonus, Decimal::ZERO);
    }

    #[test]
    fn payment_too_large_to_represent_is_rejected() {
        let mut huge = input("1", "4.2", "9.0", LoyaltyTier::Gold, true);
        huge.litres = Decimal::from_i128_with_scale(10_i128.pow(27), 0);
        let err = MilkPricing::default().price(&huge).unwrap_err();
        assert_eq!(err, crate::error::EngineError::validation("litres", "is too large"));
    }
}
