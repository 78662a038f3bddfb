//! The job worker: drains the queue and publishes one terminal event per job.

use std::sync::Arc;

use shifts_core::JobEvent;
use shifts_events::EventChannel;
use shifts_store::TripStore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::queue::Job;

/// Counter of finished jobs, labelled by terminal `status`.
pub const JOBS_COMPLETED_TOTAL: &str = "jobs_completed_total";

/// Message published with every successful job.
pub const DONE_MESSAGE: &str = "Successfully inserted data";

/// Failure message for a job reading from `source`.
pub fn failure_message(source: &str) -> String {
    format!("Unable to get data file from {source} or file cannot be converted into trips")
}

/// Single consumer of the job queue.
pub struct JobWorker {
    rx: mpsc::Receiver<Job>,
    store: TripStore,
    channel: Arc<dyn EventChannel>,
}

impl JobWorker {
    /// Create a worker that stores trips in `store` and reports on `channel`.
    pub fn new(rx: mpsc::Receiver<Job>, store: TripStore, channel: Arc<dyn EventChannel>) -> Self {
        Self { rx, store, channel }
    }

    /// Process jobs one at a time until `cancel` fires or every queue handle
    /// is dropped. A job already started runs to completion.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("job worker started");
        loop {
            let job = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                job = self.rx.recv() => job,
            };
            let Some(job) = job else {
                break;
            };
            let _ = self.process(job).await;
        }
        info!("job worker stopped");
    }

    /// Run one job and publish its terminal event. Returns that event.
    ///
    /// A publish failure is logged and not retried.
    pub async fn process(&self, job: Job) -> JobEvent {
        let Job { id, source, data } = job;
        let store = self.store.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            let trips = source.load(&data).map_err(|e| e.to_string())?;
            store.ingest(&trips).map_err(|e| e.to_string())
        })
        .await;

        let event = match outcome {
            Ok(Ok(inserted)) => {
                info!(task_id = %id, source = %source, inserted, "job done");
                JobEvent::done(Some(id), DONE_MESSAGE)
            }
            Ok(Err(reason)) => {
                warn!(task_id = %id, source = %source, reason = %reason, "job failed");
                JobEvent::failed(Some(id), failure_message(source.as_str()))
            }
            Err(e) => {
                error!(task_id = %id, source = %source, error = %e, "job panicked");
                JobEvent::failed(Some(id), failure_message(source.as_str()))
            }
        };

        metrics::counter!(JOBS_COMPLETED_TOTAL, "status" => event.status.as_str()).increment(1);
        if let Err(e) = self.channel.publish(&event).await {
            error!(task_id = ?event.task_id, error = %e, "failed to publish job event");
        }
        event
    }
}
