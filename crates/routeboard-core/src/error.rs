use chrono::NaiveTime;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("calculation window must end after it starts (start {start}, end {end})")]
    InvalidWindow { start: NaiveTime, end: NaiveTime },

    #[error("display window must end after it starts (start {start}, end {end})")]
    InvalidDisplayWindow { start: NaiveTime, end: NaiveTime },

    #[error("total work minutes per day must be positive, got {0}")]
    InvalidWorkMinutes(i64),

    #[error("minimum activity minutes must be a non-negative number, got {0}")]
    InvalidMinActivity(f64),

    #[error("invalid time of day '{0}' (expected HH:MM)")]
    InvalidTimeOfDay(String),

    #[error("column '{0}' is missing from the visit query result")]
    MissingColumn(&'static str),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
