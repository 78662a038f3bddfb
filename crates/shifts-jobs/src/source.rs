//! Trip data sources.
//!
//! A job names a source kind and an opaque `data` string whose meaning depends
//! on the kind. `mocked` reads a local CSV file at that path. `gcp` has no
//! backend and always fails.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use shifts_core::trip::parse_timestamp;
use shifts_core::{Point, TripRecord};
use thiserror::Error;

/// Where a job's trip data comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Local CSV file.
    Mocked,
    /// Cloud bucket; not supported.
    Gcp,
}

impl SourceKind {
    /// Wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mocked => "mocked",
            Self::Gcp => "gcp",
        }
    }

    /// Load every trip described by `data`.
    pub fn load(self, data: &str) -> Result<Vec<TripRecord>, SourceError> {
        match self {
            Self::Mocked => {
                let text = std::fs::read_to_string(data)
                    .map_err(|e| SourceError::Unreadable(format!("{data}: {e}")))?;
                parse_csv(&text)
            }
            Self::Gcp => Err(SourceError::Unsupported(self)),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mocked" => Ok(Self::Mocked),
            "gcp" => Ok(Self::Gcp),
            other => Err(SourceError::UnknownKind(other.to_string())),
        }
    }
}

/// Why a source produced no trips.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The source kind has no backend.
    #[error("source {0} is not supported")]
    Unsupported(SourceKind),
    /// Unrecognized source name.
    #[error("unknown source: {0}")]
    UnknownKind(String),
    /// The data could not be read.
    #[error("unreadable data: {0}")]
    Unreadable(String),
    /// A required column is absent from the header.
    #[error("missing column: {0}")]
    MissingColumn(&'static str),
    /// A data row could not be converted.
    #[error("line {line}: {reason}")]
    BadRow {
        /// 1-based line number in the file.
        line: usize,
        /// What was wrong.
        reason: String,
    },
}

const COLUMNS: [&str; 5] = [
    "region",
    "origin_coord",
    "destination_coord",
    "datetime",
    "datasource",
];

static POINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^POINT \((-?\d+(?:\.\d+)?) (-?\d+(?:\.\d+)?)\)$").unwrap());

/// Parse a `POINT (x y)` literal.
pub fn parse_wkt_point(raw: &str) -> Option<Point> {
    let caps = POINT_RE.captures(raw.trim())?;
    let x = caps.get(1)?.as_str().parse().ok()?;
    let y = caps.get(2)?.as_str().parse().ok()?;
    Some(Point::new(x, y))
}

/// Split one CSV record into trimmed fields.
///
/// Double-quoted fields may contain commas; `""` inside quotes is a literal quote.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                let _ = chars.next();
            }
            ('"', _) => quoted = !quoted,
            (',', false) => fields.push(std::mem::take(&mut field).trim().to_string()),
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    fields
}

/// Parse trip CSV text.
///
/// The header must name `region`, `origin_coord`, `destination_coord`,
/// `datetime` and `datasource`, in any order. Blank lines are skipped and
/// fields may be double-quoted.
pub fn parse_csv(text: &str) -> Result<Vec<TripRecord>, SourceError> {
    let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
    let (_, header) = lines.next().ok_or(SourceError::MissingColumn(COLUMNS[0]))?;
    let header = split_record(header);

    let mut index = [0usize; 5];
    for (slot, name) in index.iter_mut().zip(COLUMNS) {
        *slot = header
            .iter()
            .position(|h| *h == name)
            .ok_or(SourceError::MissingColumn(name))?;
    }
    let [region, origin, destination, datetime, datasource] = index;

    let mut trips = Vec::new();
    for (n, line) in lines {
        let line_no = n + 1;
        let bad = |reason: String| SourceError::BadRow {
            line: line_no,
            reason,
        };
        let fields = split_record(line);
        if fields.len() != header.len() {
            return Err(bad(format!(
                "expected {} fields, found {}",
                header.len(),
                fields.len()
            )));
        }
        let point = |i: usize| {
            parse_wkt_point(&fields[i]).ok_or_else(|| bad(format!("invalid point {:?}", fields[i])))
        };
        trips.push(TripRecord {
            region: fields[region].clone(),
            origin: point(origin)?,
            destination: point(destination)?,
            timestamp: parse_timestamp(&fields[datetime]).map_err(|e| bad(e.to_string()))?,
            source: fields[datasource].clone(),
        });
    }
    Ok(trips)
}
