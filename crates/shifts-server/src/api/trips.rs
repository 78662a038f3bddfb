//! Trip ingestion and statistics handlers.

use std::collections::HashMap;
use std::sync::LazyLock;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shifts_core::trip::parse_timestamp;
use shifts_core::{BoundingBox, Point, TripRecord};
use shifts_jobs::SourceKind;
use tracing::{error, info, instrument};

use crate::errors::ApiError;
use crate::metrics::HTTP_REQUESTS_TOTAL;
use crate::server::AppState;

/// Body of `POST /api/v1/trips`, discriminated by `data_type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "data_type", rename_all = "lowercase")]
pub enum InsertRequest {
    /// Trips inline; stored before the response is sent.
    Json {
        /// Trips to store.
        data: Vec<TripPayload>,
    },
    /// Local CSV file processed by the job worker.
    Mocked {
        /// Path of the CSV file.
        data: String,
    },
    /// Cloud bucket object processed by the job worker.
    Gcp {
        /// Object locator.
        data: String,
    },
}

/// One inline trip.
#[derive(Debug, Deserialize)]
pub struct TripPayload {
    region: String,
    origin: PointPayload,
    destination: PointPayload,
    timestamp: String,
    source: String,
}

/// A point given as `[x, y]` or as the string `"[x, y]"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PointPayload {
    /// Two-element number array.
    Pair((f64, f64)),
    /// JSON array text.
    Text(String),
}

impl PointPayload {
    fn into_point(self) -> Option<Point> {
        let (x, y) = match self {
            Self::Pair(pair) => pair,
            Self::Text(text) => serde_json::from_str::<(f64, f64)>(&text).ok()?,
        };
        Some(Point::new(x, y))
    }
}

impl TripPayload {
    fn into_record(self, index: usize) -> Result<TripRecord, ApiError> {
        let invalid = |field: &str| {
            ApiError::bad_request(format!(
                "Invalid {field} in trip {index}: expected a pair of numbers"
            ))
        };
        let origin = self.origin.into_point().ok_or_else(|| invalid("origin"))?;
        let destination = self
            .destination
            .into_point()
            .ok_or_else(|| invalid("destination"))?;
        let timestamp = parse_timestamp(&self.timestamp)
            .map_err(|e| ApiError::bad_request(format!("Invalid trip {index}: {e}")))?;
        Ok(TripRecord {
            region: self.region,
            origin,
            destination,
            timestamp,
            source: self.source,
        })
    }
}

/// Response of `GET /api/v1/trips/stats`.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Weekly trip average, `null` when no trip matched.
    pub mean: Option<f64>,
}

static QUERY_POINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?\d+(?:\.\d+)?),+(-?\d+(?:\.\d+)?)$").unwrap());

/// Parse an `x,y` query point.
pub fn parse_query_point(raw: &str) -> Option<Point> {
    let caps = QUERY_POINT_RE.captures(raw)?;
    let x = caps.get(1)?.as_str().parse().ok()?;
    let y = caps.get(2)?.as_str().parse().ok()?;
    Some(Point::new(x, y))
}

async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> shifts_store::Result<T> + Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!(error = %e, "store task failed");
        ApiError::Internal("Unable to access the trip store".into())
    })?;
    Ok(outcome?)
}

/// `POST /api/v1/trips`
#[instrument(skip_all)]
pub async fn create_trips(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    metrics::counter!(HTTP_REQUESTS_TOTAL, "route" => "create_trips").increment(1);
    let request: InsertRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {e}")))?;

    let (kind, data) = match request {
        InsertRequest::Json { data } => {
            let trips = data
                .into_iter()
                .enumerate()
                .map(|(i, trip)| trip.into_record(i))
                .collect::<Result<Vec<_>, _>>()?;
            let store = state.store.clone();
            let inserted = run_blocking(move || store.ingest(&trips)).await?;
            info!(inserted, "inline trips stored");
            let body = Json(json!({ "message": "Points inserted" }));
            return Ok((StatusCode::CREATED, body).into_response());
        }
        InsertRequest::Mocked { data } => (SourceKind::Mocked, data),
        InsertRequest::Gcp { data } => (SourceKind::Gcp, data),
    };

    let ticket = state.jobs.submit(kind, data)?;
    let body = Json(json!({
        "message": format!("Task is processing: {}", ticket.id),
        "metadata": ticket.status.as_str(),
    }));
    Ok((StatusCode::ACCEPTED, body).into_response())
}

/// `GET /api/v1/trips/stats?nortest=x,y&southest=x,y&region=R`
#[instrument(skip_all)]
pub async fn trip_stats(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<StatsResponse>, ApiError> {
    metrics::counter!(HTTP_REQUESTS_TOTAL, "route" => "trip_stats").increment(1);

    let missing: Vec<&str> = ["nortest", "region", "southest"]
        .into_iter()
        .filter(|name| !params.contains_key(*name))
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::bad_request(format!(
            "Missing query parameters: {}",
            missing.join(", ")
        )));
    }

    let mut corners = Vec::with_capacity(2);
    let mut malformed = Vec::new();
    for name in ["nortest", "southest"] {
        match params.get(name).and_then(|raw| parse_query_point(raw)) {
            Some(point) => corners.push(point),
            None => malformed.push(name),
        }
    }
    let &[north, south] = corners.as_slice() else {
        return Err(ApiError::bad_request(format!(
            "Wrong format in query parameters: {}",
            malformed.join(", ")
        )));
    };

    let bbox = BoundingBox::from_corners(south, north);
    let region = params.get("region").cloned().unwrap_or_default();
    let store = state.store.clone();
    let name = region.clone();
    let mean = run_blocking(move || {
        let Some(row) = store.region_by_name(&name)? else {
            return Ok(None);
        };
        store.weekly_average(&bbox, row.id).map(Some)
    })
    .await?;

    match mean {
        Some(mean) => Ok(Json(StatsResponse { mean })),
        None => Err(ApiError::bad_request(format!("Region {region} not found"))),
    }
}
