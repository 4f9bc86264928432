//! Date ranges handed to visit sources.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

/// Half-open range of calendar days `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Bound as the `:start_date` query parameter.
    pub fn start_param(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    /// Bound as the `:end_date` query parameter.
    pub fn end_param(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start_param(), self.end_param())
    }
}

pub fn day_range(date: NaiveDate) -> DateRange {
    DateRange {
        start: date,
        end: date + Duration::days(1),
    }
}

/// The calendar month containing `date`.
pub fn month_range(date: NaiveDate) -> DateRange {
    let start = date.with_day(1).unwrap_or(date);
    let days = days_in_month(start.year(), start.month());
    DateRange {
        start,
        end: start + Duration::days(days),
    }
}

pub fn days_in_month(year: i32, month: u32) -> i64 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(first), Some(next)) => (next - first).num_days(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_day_range() {
        let range = day_range(d(2025, 10, 1));
        assert_eq!(range.start, d(2025, 10, 1));
        assert_eq!(range.end, d(2025, 10, 2));
        assert_eq!(range.days(), 1);
        assert!(range.contains(d(2025, 10, 1)));
        assert!(!range.contains(d(2025, 10, 2)));
    }

    #[test]
    fn test_month_range_mid_month() {
        let range = month_range(d(2025, 10, 17));
        assert_eq!(range.start, d(2025, 10, 1));
        assert_eq!(range.end, d(2025, 11, 1));
        assert_eq!(range.days(), 31);
    }

    #[test]
    fn test_month_range_december_rolls_year() {
        let range = month_range(d(2025, 12, 31));
        assert_eq!(range.start, d(2025, 12, 1));
        assert_eq!(range.end, d(2026, 1, 1));
    }

    #[test]
    fn test_days_in_month_leap_year() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2025, 4), 30);
        assert_eq!(days_in_month(2025, 13), 0);
    }

    #[test]
    fn test_params_and_display() {
        let range = month_range(d(2025, 2, 10));
        assert_eq!(range.start_param(), "2025-02-01");
        assert_eq!(range.end_param(), "2025-03-01");
        assert_eq!(range.to_string(), "2025-02-01..2025-03-01");
    }
}
