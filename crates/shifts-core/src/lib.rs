//! # shifts-core
//!
//! Foundation types shared by every optimized-shifts crate.
//!
//! - [`events`]: job-status events and the WebSocket wire frames
//! - [`trip`]: trip records, points, bounding boxes
//! - [`ids`]: branded ID newtypes
//! - [`logging`]: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod logging;
pub mod trip;

pub use events::{JobEvent, JobStatus, ServerFrame};
pub use ids::{ConnectionId, JobId};
pub use trip::{BoundingBox, Point, TripParseError, TripRecord};
