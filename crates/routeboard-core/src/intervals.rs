//! Interval extraction and the minimum-activity filter

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;

use crate::{exact_minutes, Interval, TaskKind, VisitRecord, UNKNOWN_TECHNICIAN};

/// Missing, empty or blank labels collapse to [`UNKNOWN_TECHNICIAN`].
pub fn normalize_technician(label: Option<&str>) -> String {
    match label.map(str::trim) {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => UNKNOWN_TECHNICIAN.to_string(),
    }
}

/// Append `[start, end)` for `technician` when both ends exist and the span is
/// non-empty. Anything else is dropped without complaint.
pub fn push_interval(
    out: &mut Vec<Interval>,
    technician: &str,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    kind: TaskKind,
) {
    let (Some(start), Some(end)) = (start, end) else {
        return;
    };
    if start >= end {
        return;
    }
    out.push(Interval {
        technician: technician.to_string(),
        start,
        end,
        kind,
        date: start.date(),
    });
}

/// Decompose every visit into its travel and service intervals.
pub fn extract_intervals(visits: &[VisitRecord]) -> Vec<Interval> {
    let mut intervals = Vec::with_capacity(visits.len() * 2);

    for visit in visits {
        let technician = normalize_technician(visit.technician.as_deref());
        push_interval(
            &mut intervals,
            &technician,
            visit.started_travel,
            visit.arrival,
            TaskKind::Travel,
        );
        push_interval(
            &mut intervals,
            &technician,
            visit.arrival,
            visit.departure,
            TaskKind::Service,
        );
    }

    intervals
}

/// Drop every interval whose technician-day has less than `min_minutes` of
/// raw activity. Order of the surviving intervals is preserved.
pub fn filter_min_activity(intervals: Vec<Interval>, min_minutes: f64) -> Vec<Interval> {
    let qualifies = |active: Duration| exact_minutes(active) >= min_minutes;

    let (keep, technician_days): (Vec<bool>, usize) = {
        let mut active: HashMap<(&str, NaiveDate), Duration> = HashMap::new();
        for interval in &intervals {
            *active
                .entry((interval.technician.as_str(), interval.date))
                .or_insert_with(Duration::zero) += interval.duration();
        }

        let keep = intervals
            .iter()
            .map(|i| {
                active
                    .get(&(i.technician.as_str(), i.date))
                    .is_some_and(|d| qualifies(*d))
            })
            .collect();
        (keep, active.values().filter(|d| qualifies(**d)).count())
    };

    let before = intervals.len();
    let intervals: Vec<Interval> = intervals
        .into_iter()
        .zip(keep)
        .filter_map(|(interval, keep)| keep.then_some(interval))
        .collect();

    tracing::debug!(
        before,
        after = intervals.len(),
        technician_days,
        "applied minimum activity filter"
    );

    intervals
}
