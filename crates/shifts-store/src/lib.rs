//! # shifts-store
//!
//! `SQLite` storage for regions and trips.
//!
//! - [`sqlite`]: connection pool, migrations, and stateless repositories
//! - [`TripStore`]: the high-level API used by the HTTP layer and job worker
//!
//! All calls are blocking. Async callers go through
//! `tokio::task::spawn_blocking`.

#![deny(unsafe_code)]

pub mod errors;
pub mod sqlite;
pub mod store;

pub use errors::{Result, StoreError};
pub use sqlite::row_types::RegionRow;
pub use store::TripStore;
