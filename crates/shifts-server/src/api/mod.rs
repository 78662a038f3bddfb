//! `/api/v1` routes.

pub mod trips;

use axum::Router;
use axum::routing::{get, post};

use crate::server::AppState;
use crate::websocket::handler::ws_handler;

/// Routes mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/trips", post(trips::create_trips))
        .route("/trips/stats", get(trips::trip_stats))
        .route("/trips/live", get(ws_handler))
}
