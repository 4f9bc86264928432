//! CSV visit source, for exports of the timeline query.

use std::path::PathBuf;

use super::VisitSource;
use crate::columns::{Cell, ColumnMap};
use crate::error::Result;
use crate::period::DateRange;
use crate::VisitRecord;

#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Every row of the export, regardless of date.
    pub fn read_all(&self) -> Result<Vec<VisitRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        let map = ColumnMap::from_headers(&headers)?;

        let mut visits = Vec::new();
        for record in reader.records() {
            let record = record?;
            let cells: Vec<Cell> = record.iter().map(|v| Cell::Text(v.to_string())).collect();
            visits.push(map.to_visit(&cells));
        }
        Ok(visits)
    }
}

impl VisitSource for CsvSource {
    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }

    /// Keeps the visits whose first recorded timestamp falls inside `range`.
    fn fetch(&self, range: DateRange) -> Result<Vec<VisitRecord>> {
        let all = self.read_all()?;
        let total = all.len();
        let visits: Vec<VisitRecord> = all
            .into_iter()
            .filter(|v| v.first_timestamp().is_some_and(|ts| range.contains(ts.date())))
            .collect();

        tracing::debug!(
            source = %self.describe(),
            %range,
            total,
            rows = visits.len(),
            "fetched visits"
        );

        Ok(visits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use chrono::NaiveDate;
    use std::fs;

    const EXPORT: &str = "\
LeadTechnician,SessionID,StartedTravel,ArrivalTimeReal,DepartureTimeReal,\
Latitude,Longitude,CompanyName,ServiceCode
Ana,1,2025-10-01 08:50:00,2025-10-01 09:00:00,2025-10-01 09:40:00,40.41,-3.70,Acme,SV-1
,2,,2025-10-01 11:00:00,2025-10-01 11:30:00,,,,
Ben,3,2025-10-02 08:00:00,2025-10-02 08:30:00,,,,Globex,SV-2
Cleo,4,,,,,,,
";

    fn write_export(dir: &std::path::Path, content: &str) -> PathBuf {
        let path = dir.join("visits.csv");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_all() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvSource::new(write_export(dir.path(), EXPORT));
        let visits = source.read_all().unwrap();
        assert_eq!(visits.len(), 4);
        assert_eq!(visits[0].latitude, Some(40.41));
        assert_eq!(visits[1].technician, None);
        assert_eq!(visits[2].company_name.as_deref(), Some("Globex"));
    }

    #[test]
    fn test_fetch_filters_by_first_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvSource::new(write_export(dir.path(), EXPORT));
        let oct_1 = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();

        let visits = source.fetch(crate::period::day_range(oct_1)).unwrap();
        assert_eq!(visits.len(), 2);

        let month = source.fetch(crate::period::month_range(oct_1)).unwrap();
        // the row without any timestamp never matches a range
        assert_eq!(month.len(), 3);
    }

    #[test]
    fn test_missing_header() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvSource::new(write_export(
            dir.path(),
            "LeadTechnician,StartedTravel,ArrivalTimeReal\nAna,,\n",
        ));
        assert!(matches!(
            source.read_all(),
            Err(Error::MissingColumn("DepartureTimeReal"))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvSource::new(dir.path().join("nope.csv"));
        assert!(matches!(source.read_all(), Err(Error::Csv(_))));
        assert!(source.describe().starts_with("csv:"));
    }
}
