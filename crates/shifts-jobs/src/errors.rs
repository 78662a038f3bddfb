//! Job submission errors.

use thiserror::Error;

/// Errors returned when submitting a job.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    /// The queue already holds as many jobs as it accepts.
    #[error("job queue is full")]
    QueueFull,
    /// The worker has stopped; nothing will run the job.
    #[error("job queue is closed")]
    QueueClosed,
}

/// Result type for job operations.
pub type Result<T> = std::result::Result<T, JobError>;
