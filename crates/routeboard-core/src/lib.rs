#![deny(clippy::all)]

mod aggregator;
pub mod columns;
mod config;
mod error;
mod intervals;
pub mod period;
mod route;
pub mod source;
mod timeline;

pub use aggregator::*;
pub use config::*;
pub use error::{Error, Result};
pub use intervals::*;
pub use route::*;
pub use source::{CsvSource, SqliteSource, VisitSource};
pub use timeline::*;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Label used for visits that carry no technician.
pub const UNKNOWN_TECHNICIAN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskKind {
    Travel,
    Service,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Travel => "Travel",
            TaskKind::Service => "Service",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the upstream visit dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    pub technician: Option<String>,
    pub session_id: Option<String>,
    pub started_travel: Option<NaiveDateTime>,
    pub arrival: Option<NaiveDateTime>,
    pub departure: Option<NaiveDateTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub company_name: Option<String>,
    pub service_code: Option<String>,
}

impl VisitRecord {
    /// Earliest timestamp the visit carries, in column order.
    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.started_travel.or(self.arrival).or(self.departure)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub technician: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub kind: TaskKind,
    pub date: NaiveDate,
}

impl Interval {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whole seconds, sub-second remainder dropped.
    pub fn duration_secs(&self) -> i64 {
        self.duration().num_seconds()
    }

    pub fn duration_minutes(&self) -> f64 {
        exact_minutes(self.duration())
    }
}

/// Exact length of `duration` in minutes, sub-second part included.
pub fn exact_minutes(duration: Duration) -> f64 {
    duration.num_seconds() as f64 / 60.0 + f64::from(duration.subsec_nanos()) / 60e9
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub technician: String,
    pub date: NaiveDate,
    pub idle_secs: i64,
    pub travel_secs: i64,
    pub service_secs: i64,
}

impl DailyStat {
    pub fn total_secs(&self) -> i64 {
        self.idle_secs + self.travel_secs + self.service_secs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianStat {
    pub technician: String,
    pub idle_secs: i64,
    pub travel_secs: i64,
    pub service_secs: i64,
    pub idle_minutes: i64,
    pub travel_minutes: i64,
    pub service_minutes: i64,
    pub days_worked: u32,
    pub total_work_minutes: i64,
    pub idle_pct: f64,
    pub travel_pct: f64,
    pub opt_pct: f64,
}

impl TechnicianStat {
    /// Idle plus travel minutes, the time that routing could win back.
    pub fn optimizable_minutes(&self) -> i64 {
        self.idle_minutes + self.travel_minutes
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalPercentages {
    pub idle_pct: f64,
    pub travel_pct: f64,
    pub service_pct: f64,
}

/// Flattened interval row handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineInterval {
    pub technician: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub kind: TaskKind,
    pub date: NaiveDate,
    pub duration_minutes: f64,
}

impl From<Interval> for TimelineInterval {
    fn from(interval: Interval) -> Self {
        let duration_minutes = interval.duration_minutes();
        Self {
            technician: interval.technician,
            start: interval.start,
            end: interval.end,
            kind: interval.kind,
            date: interval.date,
            duration_minutes,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficiencyReport {
    pub technicians: Vec<TechnicianStat>,
    pub daily: Vec<DailyStat>,
    pub global: GlobalPercentages,
    pub intervals: Vec<TimelineInterval>,
    /// Technicians with at least one qualifying date, sorted.
    pub valid_technicians: Vec<String>,
}

impl EfficiencyReport {
    pub fn is_empty(&self) -> bool {
        self.technicians.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePoint {
    pub technician: String,
    pub latitude: f64,
    pub longitude: f64,
    pub arrival: Option<NaiveDateTime>,
    pub departure: Option<NaiveDateTime>,
    pub company_name: Option<String>,
    pub service_code: Option<String>,
}
