//! Region repository: CRUD for the `regions` table.

use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::errors::{Result, StoreError};
use crate::sqlite::row_types::RegionRow;

/// Region repository.
pub struct RegionRepo;

impl RegionRepo {
    /// Look up a region by exact name.
    pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<RegionRow>> {
        let row = conn
            .query_row(
                "SELECT region_id, region_name FROM regions WHERE region_name = ?1",
                params![name],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Look up every region whose name is in `names`. Unknown names are skipped.
    pub fn get_by_names(conn: &Connection, names: &[&str]) -> Result<Vec<RegionRow>> {
        let mut stmt = conn.prepare_cached(
            "SELECT region_id, region_name FROM regions WHERE region_name = ?1",
        )?;
        let mut rows = Vec::with_capacity(names.len());
        for name in names {
            if let Some(row) = stmt.query_row(params![name], Self::map_row).optional()? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Insert regions by name. Names that already exist are left untouched
    /// and not returned.
    pub fn create_many(conn: &Connection, names: &[&str]) -> Result<Vec<RegionRow>> {
        let mut stmt =
            conn.prepare_cached("INSERT OR IGNORE INTO regions (region_name) VALUES (?1)")?;
        let mut created = Vec::new();
        for name in names {
            if stmt.execute(params![name])? == 1 {
                created.push(RegionRow {
                    id: conn.last_insert_rowid(),
                    name: (*name).to_string(),
                });
            }
        }
        Ok(created)
    }

    /// Map every name to its region id, creating the ones that are missing.
    pub fn resolve_ids(conn: &Connection, names: &[&str]) -> Result<HashMap<String, i64>> {
        let mut ids: HashMap<String, i64> = Self::get_by_names(conn, names)?
            .into_iter()
            .map(|r| (r.name, r.id))
            .collect();

        let mut missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|n| !ids.contains_key(*n))
            .collect();
        missing.sort_unstable();
        missing.dedup();

        for row in Self::create_many(conn, &missing)? {
            let _ = ids.insert(row.name, row.id);
        }

        if let Some(name) = names.iter().find(|n| !ids.contains_key(**n)) {
            return Err(StoreError::RegionNotResolved((*name).to_string()));
        }
        Ok(ids)
    }

    /// Number of regions.
    pub fn count(conn: &Connection) -> Result<u64> {
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM regions", [], |row| row.get(0))?;
        Ok(n.unsigned_abs())
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<RegionRow> {
        Ok(RegionRow {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }
}
