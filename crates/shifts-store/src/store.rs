//! High-level trip store over the connection pool.
//!
//! Multi-step writes run inside one transaction; reads take a single pooled
//! connection.

use shifts_core::{BoundingBox, TripRecord};
use tracing::{debug, info};

use crate::errors::Result;
use crate::sqlite::connection::{self, ConnectionConfig, ConnectionPool, PooledConnection};
use crate::sqlite::migrations::run_migrations;
use crate::sqlite::repositories::{RegionRepo, TripRepo};
use crate::sqlite::row_types::RegionRow;

/// Path that selects an in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Region and trip storage.
#[derive(Clone)]
pub struct TripStore {
    pool: ConnectionPool,
}

impl TripStore {
    /// Open (creating if needed) the database at `path` and apply migrations.
    ///
    /// `":memory:"` opens a private in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let config = ConnectionConfig::default();
        let pool = if path == MEMORY_PATH {
            connection::new_in_memory(&config)?
        } else {
            connection::new_file(path, &config)?
        };
        let store = Self { pool };
        let conn = store.conn()?;
        let applied = run_migrations(&conn)?;
        drop(conn);
        info!(path, applied, "trip store ready");
        Ok(store)
    }

    /// Open a fresh in-memory store.
    pub fn in_memory() -> Result<Self> {
        Self::open(MEMORY_PATH)
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    /// Store `trips`, creating their regions as needed.
    ///
    /// Atomic: either every trip and new region is written or none is.
    /// Returns the number of trips inserted.
    pub fn ingest(&self, trips: &[TripRecord]) -> Result<usize> {
        if trips.is_empty() {
            return Ok(0);
        }
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        let names: Vec<&str> = trips.iter().map(|t| t.region.as_str()).collect();
        let region_ids = RegionRepo::resolve_ids(&tx, &names)?;
        let inserted = TripRepo::create_many(&tx, trips, &region_ids)?;

        tx.commit()?;
        debug!(inserted, regions = region_ids.len(), "trips ingested");
        Ok(inserted)
    }

    /// Look up a region by name.
    pub fn region_by_name(&self, name: &str) -> Result<Option<RegionRow>> {
        let conn = self.conn()?;
        RegionRepo::get_by_name(&conn, name)
    }

    /// Weekly trip average inside `bbox` for `region_id`.
    pub fn weekly_average(&self, bbox: &BoundingBox, region_id: i64) -> Result<Option<f64>> {
        let conn = self.conn()?;
        TripRepo::weekly_average(&conn, bbox, region_id)
    }

    /// Total number of stored trips.
    pub fn trip_count(&self) -> Result<u64> {
        let conn = self.conn()?;
        TripRepo::count(&conn)
    }

    /// Total number of stored regions.
    pub fn region_count(&self) -> Result<u64> {
        let conn = self.conn()?;
        RegionRepo::count(&conn)
    }
}
