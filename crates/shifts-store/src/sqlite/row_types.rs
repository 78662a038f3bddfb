//! Row structs mapped from query results.

/// A row of the `regions` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionRow {
    /// Primary key.
    pub id: i64,
    /// Unique region name.
    pub name: String,
}

