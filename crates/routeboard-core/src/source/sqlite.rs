//! SQLite visit source
//!
//! Runs a caller-supplied query against a read-only connection. The query may
//! reference `:start_date` and `:end_date` (or the `@`/`$` forms); each is
//! bound only when present.

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Statement};
use std::path::{Path, PathBuf};

use super::VisitSource;
use crate::columns::{Cell, ColumnMap};
use crate::error::Result;
use crate::period::DateRange;
use crate::VisitRecord;

const PARAM_PREFIXES: [char; 3] = [':', '@', '$'];

#[derive(Debug, Clone)]
pub struct SqliteSource {
    path: PathBuf,
    query: String,
}

impl SqliteSource {
    pub fn new(path: impl Into<PathBuf>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VisitSource for SqliteSource {
    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }

    fn cache_key(&self) -> String {
        format!("{}\n{}", self.describe(), self.query.trim())
    }

    fn fetch(&self, range: DateRange) -> Result<Vec<VisitRecord>> {
        let conn = open_read_only(&self.path)?;
        let mut stmt = conn.prepare(&self.query)?;

        let headers: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let map = ColumnMap::from_headers(&headers)?;

        bind_named(&mut stmt, "start_date", &range.start_param())?;
        bind_named(&mut stmt, "end_date", &range.end_param())?;

        let mut visits = Vec::new();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            let cells = (0..headers.len())
                .map(|i| row.get_ref(i).map(cell_from_ref))
                .collect::<rusqlite::Result<Vec<Cell>>>()?;
            visits.push(map.to_visit(&cells));
        }

        tracing::debug!(
            source = %self.describe(),
            %range,
            rows = visits.len(),
            "fetched visits"
        );

        Ok(visits)
    }
}

/// Run `query` without parameters and render every returned row.
pub fn check_connection(path: &Path, query: &str) -> Result<Vec<Vec<String>>> {
    let conn = open_read_only(path)?;
    let mut stmt = conn.prepare(query)?;
    let width = stmt.column_count();

    let mut rendered = Vec::new();
    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        let values = (0..width)
            .map(|i| row.get_ref(i).map(render_value))
            .collect::<rusqlite::Result<Vec<String>>>()?;
        rendered.push(values);
    }
    Ok(rendered)
}

fn open_read_only(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

fn bind_named(stmt: &mut Statement<'_>, name: &str, value: &str) -> Result<()> {
    for prefix in PARAM_PREFIXES {
        if let Some(index) = stmt.parameter_index(&format!("{prefix}{name}"))? {
            stmt.raw_bind_parameter(index, value)?;
        }
    }
    Ok(())
}

fn cell_from_ref(value: ValueRef<'_>) -> Cell {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => Cell::Null,
        ValueRef::Integer(v) => Cell::Integer(v),
        ValueRef::Real(v) => Cell::Real(v),
        ValueRef::Text(bytes) => Cell::Text(String::from_utf8_lossy(bytes).into_owned()),
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(v) => v.to_string(),
        ValueRef::Real(v) => v.to_string(),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Blob(bytes) => format!("<{} bytes>", bytes.len()),
    }
}
