//! Common types used across the ledger

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive date range for history queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Calendar month containing `date`
    pub fn month_of(date: NaiveDate) -> Self {
        let start = date.with_day(1).unwrap_or(date);
        let next_month_start = if start.month() == 12 {
            NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
        };
        let end = next_month_start
            .map(|d| d - Duration::days(1))
            .unwrap_or(date);
        Self { start, end }
    }

    /// Calendar month containing `date`, cut off at `date` itself
    pub fn month_to_date(date: NaiveDate) -> Self {
        Self {
            start: Self::month_of(date).start,
            end: date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// The calendar day before `date`
pub fn previous_day(date: NaiveDate) -> NaiveDate {
    date.pred_opt().unwrap_or(date)
}
