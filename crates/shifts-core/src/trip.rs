//! Trip records and the geometry used to query them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timestamp layout used by every trip source (`2018-05-28 09:03:40`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A planar point `(x, y)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate (longitude).
    pub x: f64,
    /// Vertical coordinate (latitude).
    pub y: f64,
}

impl Point {
    /// Build a point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Parse `"x,y"` as used by query strings.
    pub fn parse_pair(raw: &str) -> Result<Self, TripParseError> {
        let (x, y) = raw
            .split_once(',')
            .ok_or_else(|| TripParseError::Point(raw.to_owned()))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|_| TripParseError::Point(raw.to_owned()))
        };
        Ok(Self::new(parse(x)?, parse(y)?))
    }
}

/// Axis-aligned box spanned by two corners, inclusive on every edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Corner with the smallest coordinates.
    pub min: Point,
    /// Corner with the largest coordinates.
    pub max: Point,
}

impl BoundingBox {
    /// Build from any two opposite corners.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Whether `p` lies inside or on the border.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// One trip as accepted for storage.
#[derive(Clone, Debug, PartialEq)]
pub struct TripRecord {
    /// Region name; regions are created on first use.
    pub region: String,
    /// Start point.
    pub origin: Point,
    /// End point.
    pub destination: Point,
    /// When the trip happened.
    pub timestamp: NaiveDateTime,
    /// Data source label.
    pub source: String,
}

/// Errors parsing trip fields from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TripParseError {
    /// A point could not be read.
    #[error("invalid point: {0}")]
    Point(String),
    /// A timestamp did not match [`TIMESTAMP_FORMAT`].
    #[error("invalid timestamp: {0}")]
    Timestamp(String),
}

/// Parse a timestamp in [`TIMESTAMP_FORMAT`].
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, TripParseError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .map_err(|_| TripParseError::Timestamp(raw.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parse_pair_reads_both_coordinates() {
        let p = Point::parse_pair("14.5,-50.25").unwrap();
        assert_eq!(p, Point::new(14.5, -50.25));
    }

    #[test]
    fn parse_pair_rejects_garbage() {
        assert_matches!(Point::parse_pair("14.5"), Err(TripParseError::Point(_)));
        assert_matches!(Point::parse_pair("a,b"), Err(TripParseError::Point(_)));
    }

    #[test]
    fn bounding_box_normalizes_corners() {
        let bbox = BoundingBox::from_corners(Point::new(10.0, 0.0), Point::new(0.0, 10.0));
        assert_eq!(bbox.min, Point::new(0.0, 0.0));
        assert_eq!(bbox.max, Point::new(10.0, 10.0));
    }

    #[test]
    fn bounding_box_is_inclusive() {
        let bbox = BoundingBox::from_corners(Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        assert!(bbox.contains(Point::new(1.0, 1.0)));
        assert!(bbox.contains(Point::new(0.5, 0.0)));
        assert!(!bbox.contains(Point::new(1.01, 0.5)));
    }

    #[test]
    fn timestamp_round_trips_format() {
        let ts = parse_timestamp("2018-05-28 09:03:40").unwrap();
        assert_eq!(ts.format(TIMESTAMP_FORMAT).to_string(), "2018-05-28 09:03:40");
    }

    #[test]
    fn timestamp_rejects_iso_t_separator() {
        assert_matches!(
            parse_timestamp("2018-05-28T09:03:40"),
            Err(TripParseError::Timestamp(_))
        );
    }
}
