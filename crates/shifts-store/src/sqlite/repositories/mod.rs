//! Stateless repositories. Every method takes a `&Connection`, so callers
//! decide the transaction boundary.

pub mod region;
pub mod trip;

pub use region::RegionRepo;
pub use trip::TripRepo;
