//! # shifts-events
//!
//! The event channel job-status events travel on, from the job worker to every
//! live WebSocket connection.
//!
//! Every subscriber owns an independent cursor, so one publish reaches each
//! subscriber once. Two backends share that fan-out model:
//!
//! - [`LocalChannel`]: in-process, on `tokio::sync::broadcast`
//! - [`RedisChannel`]: publishes through Redis `PUBLISH`; a bridge task
//!   subscribes once and re-fans received events out locally

#![deny(unsafe_code)]

pub mod broker;
pub mod channel;
pub mod errors;
pub mod local;

pub use broker::RedisChannel;
pub use channel::{EventChannel, Subscription};
pub use errors::{ChannelError, Result};
pub use local::LocalChannel;
