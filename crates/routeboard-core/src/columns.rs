//! Logical columns of the visit dataset and how raw cells map onto them.

use chrono::{DateTime, NaiveDateTime};

use crate::error::{Error, Result};
use crate::VisitRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Timestamp,
    Number,
}

#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub header: &'static str,
    pub kind: ColumnKind,
    pub required: bool,
}

macro_rules! define_columns {
    ( $(
        $variant:ident = $index:expr => {
            header: $header:expr, kind: $kind:expr, required: $req:expr
        }
    ),+ $(,)? ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(usize)]
        pub enum Column {
            $( $variant = $index ),+
        }

        impl Column {
            pub const COUNT: usize = [ $( $index ),+ ].len();
            pub const ALL: [Column; Self::COUNT] = [ $( Column::$variant ),+ ];

            pub fn data(&self) -> &'static ColumnDef {
                &COLUMNS[*self as usize]
            }

            pub fn header(&self) -> &'static str {
                self.data().header
            }

            pub fn kind(&self) -> ColumnKind {
                self.data().kind
            }

            pub fn is_required(&self) -> bool {
                self.data().required
            }

            pub fn iter() -> impl Iterator<Item = Column> {
                Self::ALL.iter().copied()
            }

            /// Header lookup ignores ASCII case and surrounding whitespace.
            pub fn from_header(name: &str) -> Option<Column> {
                let name = name.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|c| c.header().eq_ignore_ascii_case(name))
            }
        }

        pub const COLUMNS: [ColumnDef; Column::COUNT] = [
            $( ColumnDef {
                header: $header,
                kind: $kind,
                required: $req,
            } ),+
        ];

        const _: () = {
            let mut i = 0;
            $(
                assert!($index == i, "Column indices must be sequential");
                i += 1;
                let _ = i;
            )+
        };
    };
}

define_columns!(
    Technician = 0 => { header: "LeadTechnician", kind: ColumnKind::Text, required: true },
    SessionId = 1 => { header: "SessionID", kind: ColumnKind::Text, required: false },
    StartedTravel = 2 => { header: "StartedTravel", kind: ColumnKind::Timestamp, required: true },
    Arrival = 3 => { header: "ArrivalTimeReal", kind: ColumnKind::Timestamp, required: true },
    Departure = 4 => { header: "DepartureTimeReal", kind: ColumnKind::Timestamp, required: true },
    Latitude = 5 => { header: "Latitude", kind: ColumnKind::Number, required: false },
    Longitude = 6 => { header: "Longitude", kind: ColumnKind::Number, required: false },
    CompanyName = 7 => { header: "CompanyName", kind: ColumnKind::Text, required: false },
    ServiceCode = 8 => { header: "ServiceCode", kind: ColumnKind::Text, required: false },
);

/// A raw value as a source hands it over.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

/// Position of every logical column within a source row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    positions: [Option<usize>; Column::COUNT],
}

impl ColumnMap {
    /// Resolve headers, failing on the first required column that is absent.
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Result<Self> {
        let mut positions = [None; Column::COUNT];
        for (index, header) in headers.iter().enumerate() {
            if let Some(column) = Column::from_header(header.as_ref()) {
                positions[column as usize].get_or_insert(index);
            }
        }

        let absent = |c: &Column| c.is_required() && positions[*c as usize].is_none();
        if let Some(missing) = Column::iter().find(absent) {
            return Err(Error::MissingColumn(missing.header()));
        }

        Ok(Self { positions })
    }

    pub fn position(&self, column: Column) -> Option<usize> {
        self.positions[column as usize]
    }

    /// Build a visit from one row of cells. Unreadable timestamps and
    /// coordinates become nulls.
    pub fn to_visit(&self, row: &[Cell]) -> VisitRecord {
        let cell = |column: Column| {
            self.position(column)
                .and_then(|index| row.get(index))
                .unwrap_or(&Cell::Null)
        };

        VisitRecord {
            technician: text_value(cell(Column::Technician)),
            session_id: text_value(cell(Column::SessionId)),
            started_travel: timestamp_value(Column::StartedTravel, cell(Column::StartedTravel)),
            arrival: timestamp_value(Column::Arrival, cell(Column::Arrival)),
            departure: timestamp_value(Column::Departure, cell(Column::Departure)),
            latitude: number_value(Column::Latitude, cell(Column::Latitude)),
            longitude: number_value(Column::Longitude, cell(Column::Longitude)),
            company_name: text_value(cell(Column::CompanyName)),
            service_code: text_value(cell(Column::ServiceCode)),
        }
    }
}

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

fn is_null_text(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || value.eq_ignore_ascii_case("null")
        || value.eq_ignore_ascii_case("nat")
        || value.eq_ignore_ascii_case("nan")
}

/// Parse a naive timestamp in any of the accepted textual layouts.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

fn text_value(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Null => None,
        Cell::Integer(v) => Some(v.to_string()),
        Cell::Real(v) => Some(v.to_string()),
        Cell::Text(v) if is_null_text(v) => None,
        Cell::Text(v) => Some(v.trim().to_string()),
    }
}

fn timestamp_value(column: Column, cell: &Cell) -> Option<NaiveDateTime> {
    let parsed = match cell {
        Cell::Null => return None,
        Cell::Text(v) if is_null_text(v) => return None,
        Cell::Text(v) => parse_timestamp(v),
        Cell::Integer(secs) => DateTime::from_timestamp(*secs, 0).map(|dt| dt.naive_utc()),
        Cell::Real(_) => None,
    };
    if parsed.is_none() {
        tracing::warn!(
            column = column.header(),
            value = ?cell,
            "unreadable timestamp, treating as null"
        );
    }
    parsed
}

fn number_value(column: Column, cell: &Cell) -> Option<f64> {
    let parsed = match cell {
        Cell::Null => return None,
        Cell::Text(v) if is_null_text(v) => return None,
        Cell::Text(v) => v.trim().parse::<f64>().ok(),
        Cell::Integer(v) => Some(*v as f64),
        Cell::Real(v) => Some(*v),
    };
    match parsed {
        Some(v) if v.is_finite() => Some(v),
        _ => {
            tracing::warn!(
                column = column.header(),
                value = ?cell,
                "non-numeric value, treating as null"
            );
            None
        }
    }
}
