//! Visit sources
//!
//! A source returns the visits recorded within a [`DateRange`]. Fetching
//! always happens before aggregation; the aggregator never touches a source.

mod csv_export;
mod sqlite;

pub use csv_export::CsvSource;
pub use sqlite::{check_connection, SqliteSource};

use crate::error::Result;
use crate::period::DateRange;
use crate::VisitRecord;

pub trait VisitSource {
    /// Short human-readable name of the source, used in logs.
    fn describe(&self) -> String;

    /// Everything that decides which rows `fetch` returns. Two sources with
    /// the same key must return the same rows for the same range.
    fn cache_key(&self) -> String {
        self.describe()
    }

    fn fetch(&self, range: DateRange) -> Result<Vec<VisitRecord>>;
}
