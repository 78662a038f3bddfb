//! Bounded job queue.

use serde::Serialize;
use shifts_core::JobId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::info;

use crate::errors::{JobError, Result};
use crate::source::SourceKind;

/// Counter of accepted submissions.
pub const JOBS_SUBMITTED_TOTAL: &str = "jobs_submitted_total";

/// One queued ingestion job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    /// Job ID; echoed as `task_id` in the terminal event.
    pub id: JobId,
    /// Where the trips come from.
    pub source: SourceKind,
    /// Source-specific locator (a file path for `mocked`).
    pub data: String,
}

/// Status reported at submission time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TicketStatus {
    /// Queued, not yet picked up.
    Pending,
}

impl TicketStatus {
    /// Wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
        }
    }
}

/// Receipt for a submitted job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JobTicket {
    /// ID of the queued job.
    pub id: JobId,
    /// Always [`TicketStatus::Pending`] on return from submit.
    pub status: TicketStatus,
}

/// Sending half of the job queue. Cheap to clone.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Job>,
}

impl JobQueue {
    /// Create a queue holding up to `capacity` pending jobs, plus the
    /// receiver a [`JobWorker`](crate::JobWorker) drains.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<Job>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue a job without waiting.
    pub fn submit(&self, source: SourceKind, data: impl Into<String>) -> Result<JobTicket> {
        let job = Job {
            id: JobId::new(),
            source,
            data: data.into(),
        };
        let id = job.id.clone();
        self.tx.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => JobError::QueueFull,
            TrySendError::Closed(_) => JobError::QueueClosed,
        })?;

        metrics::counter!(JOBS_SUBMITTED_TOTAL).increment(1);
        info!(task_id = %id, source = %source, "job submitted");
        Ok(JobTicket {
            id,
            status: TicketStatus::Pending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_returns_pending_ticket() {
        let (queue, mut rx) = JobQueue::bounded(4);
        let ticket = queue.submit(SourceKind::Mocked, "/tmp/trips.csv").unwrap();
        assert_eq!(ticket.status, TicketStatus::Pending);

        let job = rx.try_recv().unwrap();
        assert_eq!(job.id, ticket.id);
        assert_eq!(job.source, SourceKind::Mocked);
        assert_eq!(job.data, "/tmp/trips.csv");
    }

    #[test]
    fn ticket_ids_are_unique() {
        let (queue, _rx) = JobQueue::bounded(4);
        let a = queue.submit(SourceKind::Gcp, "a").unwrap();
        let b = queue.submit(SourceKind::Gcp, "b").unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn full_queue_rejects() {
        let (queue, _rx) = JobQueue::bounded(1);
        let _ = queue.submit(SourceKind::Gcp, "a").unwrap();
        assert_eq!(
            queue.submit(SourceKind::Gcp, "b").unwrap_err(),
            JobError::QueueFull
        );
    }

    #[test]
    fn closed_queue_rejects() {
        let (queue, rx) = JobQueue::bounded(1);
        drop(rx);
        assert_eq!(
            queue.submit(SourceKind::Gcp, "a").unwrap_err(),
            JobError::QueueClosed
        );
    }

    #[test]
    fn ticket_serializes_status_uppercase() {
        let ticket = JobTicket {
            id: JobId::from("abc"),
            status: TicketStatus::Pending,
        };
        let json = serde_json::to_value(&ticket).unwrap();
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["id"], "abc");
    }
}
