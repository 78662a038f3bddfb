//! Minimal live-notification client for manual testing.
//!
//! Connects to `/api/v1/trips/live`, answers every `ping` with a `pong` and
//! prints each notification's event JSON on its own line.
//!
//! ```text
//! cargo run -p shifts-server --example live-client -- --url ws://127.0.0.1:8000/api/v1/trips/live
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use futures::{SinkExt, StreamExt};
use shifts_core::events::PONG_TAG;
use shifts_core::{JobEvent, ServerFrame};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "live-client", about = "Print optimized-shifts job notifications")]
struct Cli {
    /// Live notification endpoint.
    #[arg(long, default_value = "ws://127.0.0.1:8000/api/v1/trips/live")]
    url: String,

    /// Log level.
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// What to do with one text frame from the server.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    /// Answer with this `pong` frame.
    Reply(String),
    /// Print this event JSON.
    Print(String),
    /// Not a frame this client understands.
    Skip,
}

fn handle_frame(text: &str) -> Action {
    match serde_json::from_str::<ServerFrame>(text) {
        Ok(ServerFrame::Ping) => Action::Reply(serde_json::json!({ "type": PONG_TAG }).to_string()),
        Ok(ServerFrame::Notification { data }) => Action::Print(data),
        Err(e) => {
            warn!(error = %e, frame = text, "unrecognized frame");
            Action::Skip
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    shifts_core::logging::init_subscriber(&args.log_level);

    let (ws, _) = connect_async(args.url.as_str())
        .await
        .with_context(|| format!("Failed to connect to {}", args.url))?;
    info!(url = %args.url, "connected");
    let (mut tx, mut rx) = ws.split();

    loop {
        let msg = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                let _ = tx.send(Message::Close(None)).await;
                break;
            }
            msg = rx.next() => msg,
        };
        let Some(msg) = msg else {
            break;
        };
        let text = match msg.context("Connection error")? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        match handle_frame(text.as_str()) {
            Action::Reply(pong) => tx
                .send(Message::Text(pong.into()))
                .await
                .context("Failed to answer ping")?,
            Action::Print(data) => {
                println!("{data}");
                if let Ok(event) = JobEvent::from_payload(&data) {
                    info!(task_id = ?event.task_id, status = event.status.as_str(), "job finished");
                }
            }
            Action::Skip => {}
        }
    }

    info!("disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shifts_core::JobId;
    use shifts_core::events::frame_tag;

    #[test]
    fn ping_is_answered_with_pong() {
        let Action::Reply(pong) = handle_frame(r#"{"type":"ping"}"#) else {
            panic!("ping must be answered");
        };
        assert_eq!(frame_tag(&pong).as_deref(), Some(PONG_TAG));
    }

    #[test]
    fn notification_prints_event_json() {
        let event = JobEvent::done(Some(JobId::from("abc")), "ok");
        let frame = ServerFrame::notification(&event).unwrap().to_text().unwrap();
        assert_eq!(
            handle_frame(&frame),
            Action::Print(r#"{"task_id":"abc","status":"DONE","message":"ok"}"#.into())
        );
    }

    #[test]
    fn unknown_frames_are_skipped() {
        assert_eq!(handle_frame(r#"{"type":"hello"}"#), Action::Skip);
        assert_eq!(handle_frame("not json"), Action::Skip);
    }
}
