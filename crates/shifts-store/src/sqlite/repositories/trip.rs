//! Trip repository: inserts and aggregate queries on the `trips` table.

use std::collections::HashMap;

use rusqlite::{Connection, params};
use shifts_core::trip::TIMESTAMP_FORMAT;
use shifts_core::{BoundingBox, TripRecord};

use crate::errors::{Result, StoreError};

/// Trip repository.
pub struct TripRepo;

impl TripRepo {
    /// Insert trips, looking up each region id in `region_ids`.
    ///
    /// Returns the number of rows inserted.
    pub fn create_many(
        conn: &Connection,
        trips: &[TripRecord],
        region_ids: &HashMap<String, i64>,
    ) -> Result<usize> {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO trips (region_id, origin_x, origin_y, destination_x, destination_y,
                                timestamp, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        let mut inserted = 0;
        for trip in trips {
            let region_id = region_ids
                .get(&trip.region)
                .ok_or_else(|| StoreError::RegionNotResolved(trip.region.clone()))?;
            inserted += stmt.execute(params![
                region_id,
                trip.origin.x,
                trip.origin.y,
                trip.destination.x,
                trip.destination.y,
                trip.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                trip.source,
            ])?;
        }
        Ok(inserted)
    }

    /// Total number of trips.
    pub fn count(conn: &Connection) -> Result<u64> {
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM trips", [], |row| row.get(0))?;
        Ok(n.unsigned_abs())
    }

    /// Mean number of trips per calendar week (Monday start) whose origin and
    /// destination both lie inside `bbox`, in region `region_id`.
    ///
    /// Only weeks with at least one matching trip count. `None` when nothing
    /// matches.
    pub fn weekly_average(
        conn: &Connection,
        bbox: &BoundingBox,
        region_id: i64,
    ) -> Result<Option<f64>> {
        let mean = conn.query_row(
            "SELECT AVG(weekly) FROM (
                SELECT COUNT(*) AS weekly
                FROM trips
                WHERE region_id = ?5
                  AND origin_x >= ?1 AND origin_x <= ?3
                  AND destination_x >= ?1 AND destination_x <= ?3
                  AND origin_y >= ?2 AND origin_y <= ?4
                  AND destination_y >= ?2 AND destination_y <= ?4
                GROUP BY date(timestamp, 'weekday 0', '-6 days')
             )",
            params![bbox.min.x, bbox.min.y, bbox.max.x, bbox.max.y, region_id],
            |row| row.get::<_, Option<f64>>(0),
        )?;
        Ok(mean)
    }

}
