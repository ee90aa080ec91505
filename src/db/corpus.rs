//! Read-only corpus accessor over the SQLite store.
//!
//! Stored dimensions are pushed into the WHERE clause. Derived dimensions
//! (`lens_type`, `time_of_day`) are left to the aggregator's in-memory check,
//! as are the exact label comparisons for numeric columns, which are pushed
//! down as a tolerance range.

use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::corpus::{CorpusAccessor, Photo, Session};
use crate::error::{EngineError, EngineResult};
use crate::facets::{CancelToken, Dimension, FilterState};

use super::schema::DATE_FORMAT;

pub(crate) const SESSION_COLUMNS: &str =
    "id, name, category, group_name, total_photos, total_raw_photos";

const PHOTO_COLUMNS: &str = "id, session_id, camera, lens, aperture, shutter_speed, iso, \
                             focal_length, date_taken, category, group_name";

/// Labels round to two decimals, so any stored value within this distance of
/// a label may carry it.
const NUMERIC_TOLERANCE: f64 = 0.006;

const CANCEL_CHECK_INTERVAL: usize = 4096;

pub(crate) fn read_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        group: row.get(3)?,
        total_photos: row.get(4)?,
        total_raw_photos: row.get(5)?,
    })
}

fn parse_date(raw: Option<String>) -> Option<NaiveDateTime> {
    let raw = raw?;
    NaiveDateTime::parse_from_str(&raw, DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

fn read_photo(row: &Row<'_>) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        session_id: row.get(1)?,
        camera: row.get(2)?,
        lens: row.get(3)?,
        aperture: row.get(4)?,
        shutter_speed: row.get(5)?,
        iso: row.get(6)?,
        focal_length: row.get(7)?,
        date_taken: parse_date(row.get(8)?),
        category: row.get(9)?,
        group: row.get(10)?,
    })
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// WHERE clause and bound values for the stored dimensions of `filter`.
fn pushdown(filter: &FilterState) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    for (dimension, selected) in filter.iter().filter(|(d, _)| d.is_stored()) {
        let text_column = match dimension {
            Dimension::Category => Some("category"),
            Dimension::Group => Some("group_name"),
            Dimension::Camera => Some("camera"),
            Dimension::Lens => Some("lens"),
            Dimension::ShutterSpeed => Some("shutter_speed"),
            _ => None,
        };
        if let Some(column) = text_column {
            clauses.push(format!("{} IN ({})", column, placeholders(selected.len())));
            values.extend(selected.iter().map(|v| Value::Text(v.clone())));
            continue;
        }

        match dimension {
            Dimension::Iso => {
                let isos: Vec<i64> = selected.iter().filter_map(|v| v.parse().ok()).collect();
                clauses.push(format!("iso IN ({})", placeholders(isos.len().max(1))));
                if isos.is_empty() {
                    values.push(Value::Null);
                }
                values.extend(isos.into_iter().map(Value::Integer));
            }
            Dimension::Aperture | Dimension::FocalLength => {
                let column = if dimension == Dimension::Aperture { "aperture" } else { "focal_length" };
                let targets: Vec<f64> = selected.iter().filter_map(|v| v.parse().ok()).collect();
                if targets.is_empty() {
                    clauses.push("0".to_string());
                    continue;
                }
                let ranges = vec![format!("{} BETWEEN ? AND ?", column); targets.len()];
                clauses.push(format!("({})", ranges.join(" OR ")));
                for target in targets {
                    values.push(Value::Real(target - NUMERIC_TOLERANCE));
                    values.push(Value::Real(target + NUMERIC_TOLERANCE));
                }
            }
            _ => {}
        }
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

pub struct SqliteCorpus {
    path: PathBuf,
}

impl SqliteCorpus {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Each call opens its own connection so facet queries can run on
    /// separate blocking threads.
    fn connect(&self) -> EngineResult<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            EngineError::CorpusUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }
}

impl CorpusAccessor for SqliteCorpus {
    fn query(&self, filter: &FilterState, cancel: &CancelToken) -> EngineResult<Vec<Photo>> {
        let conn = self.connect()?;
        let (where_clause, values) = pushdown(filter);
        let sql = format!("SELECT {} FROM photos{} ORDER BY id", PHOTO_COLUMNS, where_clause);

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values), read_photo)?;

        let mut photos = Vec::new();
        for (i, row) in rows.enumerate() {
            if i % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            photos.push(row?);
        }

        tracing::trace!(filter = %filter.signature(), rows = photos.len(), "Corpus query");
        Ok(photos)
    }

    fn sessions(&self) -> EngineResult<Vec<Session>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM sessions ORDER BY id", SESSION_COLUMNS))?;
        let sessions = stmt
            .query_map([], read_session)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    fn dataset_version(&self) -> EngineResult<u64> {
        let conn = self.connect()?;
        let version: i64 = conn.query_row(
            "SELECT version FROM dataset_meta WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(version as u64)
    }
}
