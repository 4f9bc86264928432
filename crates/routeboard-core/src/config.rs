//! Calculation and display windows.
//!
//! Both are plain values supplied by the caller. Nothing in the core reads
//! configuration files or the environment.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_WINDOW_START: (u32, u32) = (8, 0);
const DEFAULT_WINDOW_END: (u32, u32) = (17, 0);
const DEFAULT_TOTAL_WORK_MINUTES: i64 = 540;
const DEFAULT_MIN_ACTIVITY_MINUTES: f64 = 5.0;

const DEFAULT_DISPLAY_START: (u32, u32) = (6, 0);
const DEFAULT_DISPLAY_END: (u32, u32) = (20, 0);

fn hm((hour, minute): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

/// Parse a time of day written as `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| Error::InvalidTimeOfDay(value.to_string()))
}

/// Parameters of the efficiency computation.
///
/// `total_work_minutes_per_day` is the denominator used for percentages and is
/// deliberately independent of the window length used for clipping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficiencyConfig {
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub total_work_minutes_per_day: i64,
    pub min_activity_minutes: f64,
}

impl Default for EfficiencyConfig {
    fn default() -> Self {
        Self {
            window_start: hm(DEFAULT_WINDOW_START),
            window_end: hm(DEFAULT_WINDOW_END),
            total_work_minutes_per_day: DEFAULT_TOTAL_WORK_MINUTES,
            min_activity_minutes: DEFAULT_MIN_ACTIVITY_MINUTES,
        }
    }
}

impl EfficiencyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_end <= self.window_start {
            return Err(Error::InvalidWindow {
                start: self.window_start,
                end: self.window_end,
            });
        }
        if self.total_work_minutes_per_day <= 0 {
            return Err(Error::InvalidWorkMinutes(self.total_work_minutes_per_day));
        }
        if !self.min_activity_minutes.is_finite() || self.min_activity_minutes < 0.0 {
            return Err(Error::InvalidMinActivity(self.min_activity_minutes));
        }
        Ok(())
    }

    /// Calculation window `[start, end)` for the given date.
    pub fn window_for(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        (date.and_time(self.window_start), date.and_time(self.window_end))
    }

    pub fn window_secs(&self) -> i64 {
        (self.window_end - self.window_start).num_seconds()
    }

    /// Seconds a single technician-day is measured against.
    pub fn available_secs_per_day(&self) -> i64 {
        self.total_work_minutes_per_day * 60
    }
}

/// Time-of-day range the timeline is drawn over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// When false the timeline range follows the data instead.
    pub clip: bool,
}

impl Default for DisplayWindow {
    fn default() -> Self {
        Self {
            start: hm(DEFAULT_DISPLAY_START),
            end: hm(DEFAULT_DISPLAY_END),
            clip: true,
        }
    }
}

impl DisplayWindow {
    pub fn validate(&self) -> Result<()> {
        if self.end <= self.start {
            return Err(Error::InvalidDisplayWindow {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn display_range(&self, date: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
        self.clip
            .then(|| (date.and_time(self.start), date.and_time(self.end)))
    }
}
