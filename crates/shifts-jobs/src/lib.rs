//! # shifts-jobs
//!
//! Background trip ingestion.
//!
//! [`JobQueue::submit`] enqueues a job and hands back a [`JobTicket`]. A
//! single [`JobWorker`] drains the queue, loads trips from the job's
//! [`SourceKind`], stores them, and publishes exactly one terminal
//! [`JobEvent`](shifts_core::JobEvent) per job on the event channel.

#![deny(unsafe_code)]

pub mod errors;
pub mod queue;
pub mod source;
pub mod worker;

pub use errors::{JobError, Result};
pub use queue::{Job, JobQueue, JobTicket, TicketStatus};
pub use source::{SourceError, SourceKind};
pub use worker::JobWorker;
