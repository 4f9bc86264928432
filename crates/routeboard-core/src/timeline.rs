//! Timeline view over the flattened interval table.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::DisplayWindow;
use crate::TimelineInterval;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineLane {
    pub technician: String,
    pub intervals: Vec<TimelineInterval>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub lanes: Vec<TimelineLane>,
}

impl Timeline {
    /// Relative position of `ts` within the visible range, clamped to `[0, 1]`.
    pub fn position(&self, ts: NaiveDateTime) -> f64 {
        let span = (self.end - self.start).num_seconds();
        if span <= 0 {
            return 0.0;
        }
        let offset = (ts - self.start).num_seconds();
        (offset as f64 / span as f64).clamp(0.0, 1.0)
    }
}

/// Lay `intervals` out in one lane per technician, sorted by name.
///
/// The visible range is the display window on `date` when clipping is on,
/// otherwise the span of the data. Returns `None` when there is nothing to
/// draw.
pub fn build_timeline(
    intervals: &[TimelineInterval],
    date: NaiveDate,
    display: &DisplayWindow,
) -> Option<Timeline> {
    if intervals.is_empty() {
        return None;
    }

    let (start, end) = match display.display_range(date) {
        Some(range) => range,
        None => {
            let start = intervals.iter().map(|i| i.start).min()?;
            let end = intervals.iter().map(|i| i.end).max()?;
            (start, end)
        }
    };

    let mut by_tech: BTreeMap<&str, Vec<TimelineInterval>> = BTreeMap::new();
    for interval in intervals {
        by_tech
            .entry(interval.technician.as_str())
            .or_default()
            .push(interval.clone());
    }

    let lanes = by_tech
        .into_iter()
        .map(|(technician, mut intervals)| {
            intervals.sort_by_key(|i| i.start);
            TimelineLane {
                technician: technician.to_string(),
                intervals,
            }
        })
        .collect();

    Some(Timeline { start, end, lanes })
}
