//! Farmer loyalty tier rules
//!
//! Tiers are derived from the farmer's month-to-date litres, which callers
//! recompute from recorded deliveries on every read. Upgrades move at most
//! one step per delivery and a tier is never lowered automatically.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::LoyaltyTier;

/// Result of evaluating a tier after a delivery
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierEvaluation {
    pub previous_tier: LoyaltyTier,
    pub current_tier: LoyaltyTier,
    pub month_to_date_litres: Decimal,
}

impl TierEvaluation {
    pub fn upgraded(&self) -> bool {
        self.current_tier != self.previous_tier
    }

    /// The new tier, only when an upgrade happened
    pub fn new_tier(&self) -> Option<LoyaltyTier> {
        self.upgraded().then_some(self.current_tier)
    }
}

/// Evaluate the tier for a farmer whose month-to-date litres (including the
/// delivery just recorded) are `month_to_date_litres`
pub fn evaluate_tier(current: LoyaltyTier, month_to_date_litres: Decimal) -> TierEvaluation {
    let current_tier = match current.next() {
        Some(next) if month_to_date_litres >= next.monthly_threshold_litres() => next,
        _ => current,
    };

    TierEvaluation {
        previous_tier: current,
        current_tier,
        month_to_date_litres,
    }
}

/// Progress towards the next tier for dashboard display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierProgress {
    pub current_tier: LoyaltyTier,
    pub next_tier: Option<LoyaltyTier>,
    pub target_litres: Option<Decimal>,
    /// Fraction of the target reached, capped at 1
    pub progress: Decimal,
}

pub fn tier_progress(current: LoyaltyTier, month_to_date_litres: Decimal) -> TierProgress {
    match current.next() {
        Some(next) => {
            let target = next.monthly_threshold_litres();
            let progress = (month_to_date_litres / target).min(Decimal::ONE).round_dp(4);
            TierProgress {
                current_tier: current,
                next_tier: Some(next),
                target_litres: Some(target),
                progress: progress.max(Decimal::ZERO),
            }
        }
        None => TierProgress {
            current_tier: current,
            next_tier: None,
            target_litres: None,
            progress: Decimal::ONE,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bronze_upgrades_exactly_at_1500() {
        let below = evaluate_tier(LoyaltyTier::Bronze, Decimal::new(14999, 1));
        assert!(!below.upgraded());

        let at = evaluate_tier(LoyaltyTier::Bronze, Decimal::from(1500));
        assert_eq!(at.new_tier(), Some(LoyaltyTier::Silver));
    }

    #[test]
    fn upgrades_one_step_at_a_time() {
        let eval = evaluate_tier(LoyaltyTier::Bronze, Decimal::from(6000));
        assert_eq!(eval.current_tier, LoyaltyTier::Silver);

        let eval = evaluate_tier(LoyaltyTier::Silver, Decimal::from(6000));
        assert_eq!(eval.current_tier, LoyaltyTier::Gold);

        let eval = evaluate_tier(LoyaltyTier::Gold, Decimal::from(5000));
        assert_eq!(eval.current_tier, LoyaltyTier::Platinum);
    }

    #[test]
    fn platinum_stays_platinum() {
        let eval = evaluate_tier(LoyaltyTier::Platinum, Decimal::ZERO);
        assert_eq!(eval.current_tier, LoyaltyTier::Platinum);
        assert_eq!(tier_progress(LoyaltyTier::Platinum, Decimal::ZERO).progress, Decimal::ONE);
    }

    #[test]
    fn progress_is_capped() {
        let progress = tier_progress(LoyaltyTier::Silver, Decimal::from(4500));
        assert_eq!(progress.next_tier, Some(LoyaltyTier::Gold));
        assert_eq!(progress.target_litres, Some(Decimal::from(3000)));
        assert_eq!(progress.progress, Decimal::ONE);

        let half = tier_progress(LoyaltyTier::Bronze, Decimal::from(750));
        assert_eq!(half.progress, Decimal::new(5, 1));
    }

    fn tier_strategy() -> impl Strategy<Value = LoyaltyTier> {
        prop_oneof![
            Just(LoyaltyTier::Bronze),
            Just(LoyaltyTier::Silver),
            Just(LoyaltyTier::Gold),
            Just(LoyaltyTier::Platinum),
        ]
    }

    proptest! {
        #[test]
        fn tier_never_decreases(tier in tier_strategy(), litres in 0i64..100_000i64) {
            let eval = evaluate_tier(tier, Decimal::new(litres, 1));
            prop_assert!(eval.current_tier >= tier);
            prop_assert!(eval.current_tier == tier || Some(eval.current_tier) == tier.next());
        }
    }
}
