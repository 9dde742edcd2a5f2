//! Raw milk quality grading
//!
//! Acceptance is decided by a small list of minimum-quality rules; the
//! 0-100 quality score is computed for every reading, accepted or not, so
//! rejected deliveries still feed trend analysis.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::validation::{validate_non_negative, validate_range, validate_scale};

/// Decimal places a lab reading may carry; readings are stored at this scale
pub const READING_DP: u32 = 2;

/// Lab readings taken at the collection point
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LabReading {
    pub litres: Decimal,
    pub fat_percent: Decimal,
    pub snf_percent: Decimal,
    pub temperature_celsius: Decimal,
}

impl LabReading {
    pub fn validate(&self) -> EngineResult<()> {
        validate_non_negative("litres", self.litres)?;
        validate_range("fat_percent", self.fat_percent, Decimal::ZERO, Decimal::from(10))?;
        validate_range("snf_percent", self.snf_percent, Decimal::ZERO, Decimal::from(12))?;
        validate_range(
            "temperature_celsius",
            self.temperature_celsius,
            Decimal::ZERO,
            Decimal::from(50),
        )?;
        validate_scale("fat_percent", self.fat_percent, READING_DP)?;
        validate_scale("snf_percent", self.snf_percent, READING_DP)?;
        validate_scale("temperature_celsius", self.temperature_celsius, READING_DP)?;
        Ok(())
    }
}

/// A minimum-quality rule a delivery must pass to be accepted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "rule", content = "limit", rename_all = "snake_case")]
pub enum QualityRule {
    MinFatPercent(Decimal),
    MinSnfPercent(Decimal),
    MaxTemperature(Decimal),
}

impl QualityRule {
    /// Returns the failure when `reading` breaks this rule
    pub fn check(&self, reading: &LabReading) -> Option<RejectionCause> {
        match *self {
            QualityRule::MinFatPercent(min) if reading.fat_percent < min => {
                Some(RejectionCause::LowFat { measured: reading.fat_percent, minimum: min })
            }
            QualityRule::MinSnfPercent(min) if reading.snf_percent < min => {
                Some(RejectionCause::LowSnf { measured: reading.snf_percent, minimum: min })
            }
            QualityRule::MaxTemperature(max) if reading.temperature_celsius > max => {
                Some(RejectionCause::TooWarm {
                    measured: reading.temperature_celsius,
                    maximum: max,
                })
            }
            _ => None,
        }
    }
}

/// Cooperative acceptance standard: fat >= 3.0%, SNF >= 7.5%, temperature <= 15 C
pub fn acceptance_rules() -> [QualityRule; 3] {
    [
        QualityRule::MinFatPercent(Decimal::new(30, 1)),
        QualityRule::MinSnfPercent(Decimal::new(75, 1)),
        QualityRule::MaxTemperature(Decimal::from(15)),
    ]
}

/// Why a delivery failed the acceptance standard
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum RejectionCause {
    LowFat { measured: Decimal, minimum: Decimal },
    LowSnf { measured: Decimal, minimum: Decimal },
    TooWarm { measured: Decimal, maximum: Decimal },
}

impl std::fmt::Display for RejectionCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionCause::LowFat { measured, minimum } => {
                write!(f, "Fat {}% below minimum {}%", measured, minimum)
            }
            RejectionCause::LowSnf { measured, minimum } => {
                write!(f, "SNF {}% below minimum {}%", measured, minimum)
            }
            RejectionCause::TooWarm { measured, maximum } => {
                write!(f, "Temperature {}C above maximum {}C", measured, maximum)
            }
        }
    }
}

/// Accept/reject branch of grading
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GradingDecision {
    Accepted,
    Rejected { causes: Vec<RejectionCause> },
}

impl GradingDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, GradingDecision::Accepted)
    }
}

/// Outcome of grading a reading
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityAssessment {
    pub decision: GradingDecision,
    pub quality_score: Decimal,
    pub quality_label: QualityLabel,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QualityLabel {
    Excellent,
    Good,
}

impl QualityLabel {
    pub fn for_score(score: Decimal) -> Self {
        if score >= Decimal::from(85) {
            QualityLabel::Excellent
        } else {
            QualityLabel::Good
        }
    }
}

/// Quality score on a 0-100 scale, rounded to 2 decimal places.
///
/// Fat contributes up to 40 points (full marks at 4.0%), SNF up to 30
/// (full marks at 9.0%), temperature 20 at <= 6C or 10 at <= 10C, and volume
/// 10 for deliveries of 50 L or more, 5 otherwise. Empty deliveries score 0.
pub fn quality_score(reading: &LabReading) -> Decimal {
    if reading.litres <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let fat = reading.fat_percent.clamp(Decimal::ZERO, Decimal::from(4));
    let snf = reading.snf_percent.clamp(Decimal::ZERO, Decimal::from(9));
    let fat_points = fat / Decimal::from(4) * Decimal::from(40);
    let snf_points = snf / Decimal::from(9) * Decimal::from(30);

    let temperature_points = if reading.temperature_celsius <= Decimal::from(6) {
        Decimal::from(20)
    } else if reading.temperature_celsius <= Decimal::from(10) {
        Decimal::from(10)
    } else {
        Decimal::ZERO
    };

    let volume_points = if reading.litres >= Decimal::from(50) {
        Decimal::from(10)
    } else {
        Decimal::from(5)
    };

    (fat_points + snf_points + temperature_points + volume_points).round_dp(2)
}

/// Decide acceptance against `rules` and score the reading
pub fn grade_reading(reading: &LabReading, rules: &[QualityRule]) -> EngineResult<QualityAssessment> {
    reading.validate()?;

    let causes: Vec<RejectionCause> = rules.iter().filter_map(|rule| rule.check(reading)).collect();
    let decision = if causes.is_empty() {
        GradingDecision::Accepted
    } else {
        GradingDecision::Rejected { causes }
    };

    let score = quality_score(reading);
    Ok(QualityAssessment {
        decision,
        quality_score: score,
        quality_label: QualityLabel::for_score(score),
    })
}

/// Grade against the cooperative's standard acceptance rules
pub fn grade_delivery(reading: &LabReading) -> EngineResult<QualityAssessment> {
    grade_reading(reading, &acceptance_rules())
}
