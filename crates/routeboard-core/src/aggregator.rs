//! Efficiency aggregation
//!
//! Groups filtered intervals per technician-day, clips each group against the
//! calculation window and folds the per-day results into per-technician and
//! global figures. Uses rayon for the per-group map and the fold/reduce.

use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

use crate::config::EfficiencyConfig;
use crate::error::Result;
use crate::intervals::{extract_intervals, filter_min_activity};
use crate::{
    DailyStat, EfficiencyReport, GlobalPercentages, Interval, TaskKind, TechnicianStat,
    TimelineInterval, VisitRecord,
};

/// Run the whole pipeline: extraction, minimum-activity filter, per-day
/// classification and aggregation.
///
/// An empty or fully filtered dataset yields an empty report with zeroed
/// percentages. Only an unusable `config` is an error.
pub fn calculate_efficiency_stats(
    visits: &[VisitRecord],
    config: &EfficiencyConfig,
) -> Result<EfficiencyReport> {
    config.validate()?;

    let intervals = filter_min_activity(extract_intervals(visits), config.min_activity_minutes);
    if intervals.is_empty() {
        tracing::debug!(visits = visits.len(), "no qualifying activity");
        return Ok(EfficiencyReport::default());
    }

    let daily = compute_daily_stats(&intervals, config);
    let technicians = aggregate_by_technician(&daily, config);
    let global = global_percentages(&daily, config);
    let valid_technicians = technicians.iter().map(|t| t.technician.clone()).collect();

    tracing::debug!(
        visits = visits.len(),
        intervals = intervals.len(),
        technician_days = daily.len(),
        technicians = technicians.len(),
        "computed efficiency stats"
    );

    Ok(EfficiencyReport {
        technicians,
        daily,
        global,
        intervals: intervals.into_iter().map(TimelineInterval::from).collect(),
        valid_technicians,
    })
}

/// One [`DailyStat`] per technician-day present in `intervals`, ordered by
/// technician then date.
pub fn compute_daily_stats(intervals: &[Interval], config: &EfficiencyConfig) -> Vec<DailyStat> {
    let mut groups: BTreeMap<(&str, NaiveDate), Vec<&Interval>> = BTreeMap::new();
    for interval in intervals {
        groups
            .entry((interval.technician.as_str(), interval.date))
            .or_default()
            .push(interval);
    }

    groups
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|((technician, date), tasks)| classify_day(technician, date, &tasks, config))
        .collect()
}

/// Attribute every second of the calculation window on `date` to idle,
/// travel or service time.
///
/// Tasks are walked in start order behind a cursor. Where tasks overlap, the
/// one that starts first keeps the overlapping span; a later task only adds
/// what lies past the cursor. Travel and service are summed exactly and cut
/// to whole seconds once per day; idle is the rest of the window.
pub fn classify_day(
    technician: &str,
    date: NaiveDate,
    tasks: &[&Interval],
    config: &EfficiencyConfig,
) -> DailyStat {
    let mut tasks = tasks.to_vec();
    tasks.sort_by_key(|t| t.start);

    let (window_start, window_end) = config.window_for(date);
    let mut travel = Duration::zero();
    let mut service = Duration::zero();
    let mut cursor = window_start;

    for task in tasks {
        let start = task.start.max(window_start);
        let end = task.end.min(window_end);
        if start >= end {
            continue;
        }

        let counted_from = start.max(cursor);
        if counted_from < end {
            match task.kind {
                TaskKind::Travel => travel += end - counted_from,
                TaskKind::Service => service += end - counted_from,
            }
        }

        cursor = cursor.max(end);
    }

    let travel_secs = travel.num_seconds();
    let service_secs = service.num_seconds();

    DailyStat {
        technician: technician.to_string(),
        date,
        idle_secs: config.window_secs() - travel_secs - service_secs,
        travel_secs,
        service_secs,
    }
}

/// Sum daily stats per technician and derive minutes and percentages.
pub fn aggregate_by_technician(
    daily: &[DailyStat],
    config: &EfficiencyConfig,
) -> Vec<TechnicianStat> {
    let per_tech: HashMap<&str, ActivityTotals> = daily
        .par_iter()
        .fold(HashMap::new, |mut acc: HashMap<&str, ActivityTotals>, stat| {
            acc.entry(stat.technician.as_str())
                .or_default()
                .add_day(stat);
            acc
        })
        .reduce(HashMap::new, |mut a, b| {
            for (technician, totals) in b {
                a.entry(technician).or_default().merge(totals);
            }
            a
        });

    let mut stats: Vec<TechnicianStat> = per_tech
        .into_iter()
        .map(|(technician, totals)| totals.into_technician_stat(technician, config))
        .collect();

    stats.sort_by(|a, b| a.technician.cmp(&b.technician));
    stats
}

/// Idle/travel/service share of all qualifying technician-days.
pub fn global_percentages(daily: &[DailyStat], config: &EfficiencyConfig) -> GlobalPercentages {
    let totals = daily
        .par_iter()
        .fold(ActivityTotals::default, |mut acc, stat| {
            acc.add_day(stat);
            acc
        })
        .reduce(ActivityTotals::default, |mut a, b| {
            a.merge(b);
            a
        });

    let possible_secs = i64::from(totals.days) * config.available_secs_per_day();
    GlobalPercentages {
        idle_pct: percentage(totals.idle_secs, possible_secs),
        travel_pct: percentage(totals.travel_secs, possible_secs),
        service_pct: percentage(totals.service_secs, possible_secs),
    }
}

/// `part / whole * 100` rounded to one decimal, or 0 when `whole` is not
/// positive.
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    round_one_decimal(part as f64 / whole as f64 * 100.0)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// =============================================================================
// Internal helpers
// =============================================================================

#[derive(Debug, Default, Clone, Copy)]
struct ActivityTotals {
    idle_secs: i64,
    travel_secs: i64,
    service_secs: i64,
    days: u32,
}

impl ActivityTotals {
    fn add_day(&mut self, stat: &DailyStat) {
        self.idle_secs += stat.idle_secs;
        self.travel_secs += stat.travel_secs;
        self.service_secs += stat.service_secs;
        self.days += 1;
    }

    fn merge(&mut self, other: ActivityTotals) {
        self.idle_secs += other.idle_secs;
        self.travel_secs += other.travel_secs;
        self.service_secs += other.service_secs;
        self.days += other.days;
    }

    fn into_technician_stat(self, technician: &str, config: &EfficiencyConfig) -> TechnicianStat {
        let idle_minutes = self.idle_secs / 60;
        let travel_minutes = self.travel_secs / 60;
        let service_minutes = self.service_secs / 60;
        let total_work_minutes = i64::from(self.days) * config.total_work_minutes_per_day;

        TechnicianStat {
            technician: technician.to_string(),
            idle_secs: self.idle_secs,
            travel_secs: self.travel_secs,
            service_secs: self.service_secs,
            idle_minutes,
            travel_minutes,
            service_minutes,
            days_worked: self.days,
            total_work_minutes,
            idle_pct: percentage(idle_minutes, total_work_minutes),
            travel_pct: percentage(travel_minutes, total_work_minutes),
            opt_pct: percentage(idle_minutes + travel_minutes, total_work_minutes),
        }
    }
}
