//! Job-status events and the WebSocket wire frames that carry them.
//!
//! A [`JobEvent`] is published once per finished ingestion job. On the wire it
//! travels as the string payload of a [`ServerFrame::Notification`]. Clients
//! answer [`ServerFrame::Ping`] with `{"type":"pong"}`.

use serde::{Deserialize, Serialize};

use crate::ids::JobId;

/// Terminal outcome of a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    /// The job finished and its data was stored.
    Done,
    /// The job could not load or store its data.
    Failed,
}

impl JobStatus {
    /// Wire spelling (`"DONE"` / `"FAILED"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }
}

/// A job-status event as published on the event channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    /// Job the event belongs to, when known.
    pub task_id: Option<JobId>,
    /// Outcome.
    pub status: JobStatus,
    /// Human-readable detail.
    pub message: String,
}

impl JobEvent {
    /// Successful completion of `task_id`.
    pub fn done(task_id: Option<JobId>, message: impl Into<String>) -> Self {
        Self {
            task_id,
            status: JobStatus::Done,
            message: message.into(),
        }
    }

    /// Failed completion of `task_id`.
    pub fn failed(task_id: Option<JobId>, message: impl Into<String>) -> Self {
        Self {
            task_id,
            status: JobStatus::Failed,
            message: message.into(),
        }
    }

    /// Serialize to the JSON text published on the channel.
    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse an event from its JSON text.
    pub fn from_payload(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

/// Frames the server sends over a live connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    /// Liveness probe; the client must answer with a `pong` frame.
    Ping,
    /// One job-status event, carried as its JSON text.
    Notification {
        /// Serialized [`JobEvent`].
        data: String,
    },
}

impl ServerFrame {
    /// Wrap an event into a notification frame.
    pub fn notification(event: &JobEvent) -> serde_json::Result<Self> {
        Ok(Self::Notification {
            data: event.to_payload()?,
        })
    }

    /// Serialize the frame to JSON text.
    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Tag every client frame must carry to answer a ping.
pub const PONG_TAG: &str = "pong";

#[derive(Deserialize)]
struct Tagged {
    #[serde(rename = "type")]
    kind: String,
}

/// Extract the `type` discriminator from a client frame.
///
/// Returns `None` when the text is not a JSON object with a string `type`.
pub fn frame_tag(text: &str) -> Option<String> {
    serde_json::from_str::<Tagged>(text).ok().map(|t| t.kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_payload_matches_wire_shape() {
        let event = JobEvent::done(Some(JobId::from("abc")), "ok");
        let value: serde_json::Value = serde_json::from_str(&event.to_payload().unwrap()).unwrap();
        assert_eq!(value, json!({"task_id": "abc", "status": "DONE", "message": "ok"}));
    }

    #[test]
    fn event_without_task_id_serializes_null() {
        let event = JobEvent::failed(None, "boom");
        let value: serde_json::Value = serde_json::from_str(&event.to_payload().unwrap()).unwrap();
        assert!(value["task_id"].is_null());
        assert_eq!(value["status"], "FAILED");
    }

    #[test]
    fn event_parses_from_payload() {
        let event =
            JobEvent::from_payload(r#"{"task_id":null,"status":"FAILED","message":"x"}"#).unwrap();
        assert_eq!(event.status, JobStatus::Failed);
        assert!(event.task_id.is_none());
    }

    #[test]
    fn unknown_status_is_rejected() {
        let result = JobEvent::from_payload(r#"{"task_id":"a","status":"PENDING","message":""}"#);
        assert!(result.is_err());
    }

    #[test]
    fn ping_frame_text() {
        assert_eq!(ServerFrame::Ping.to_text().unwrap(), r#"{"type":"ping"}"#);
    }

    #[test]
    fn notification_frame_carries_event_as_string() {
        let event = JobEvent::done(Some(JobId::from("abc")), "ok");
        let text = ServerFrame::notification(&event).unwrap().to_text().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "notification");
        let data = value["data"].as_str().unwrap();
        assert_eq!(JobEvent::from_payload(data).unwrap(), event);
    }

    #[test]
    fn frame_tag_reads_type() {
        assert_eq!(frame_tag(r#"{"type":"pong"}"#).as_deref(), Some(PONG_TAG));
        assert_eq!(frame_tag(r#"{"type":"ack","x":1}"#).as_deref(), Some("ack"));
    }

    #[test]
    fn frame_tag_rejects_non_objects() {
        assert!(frame_tag("pong").is_none());
        assert!(frame_tag("[1,2]").is_none());
        assert!(frame_tag(r#"{"type":1}"#).is_none());
        assert!(frame_tag("").is_none());
    }

    #[test]
    fn status_as_str() {
        assert_eq!(JobStatus::Done.as_str(), "DONE");
        assert_eq!(JobStatus::Failed.as_str(), "FAILED");
    }
}
